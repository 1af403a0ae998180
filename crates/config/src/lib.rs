//! Configuration for wallhub.
//!
//! Values are layered, later layers winning:
//!
//! 1. Platform defaults (the library lives in the user's data directory).
//! 2. A config file: the one passed explicitly, or the first of
//!    `config.{toml,yaml,yml,json}` found in the platform config directory.
//! 3. `WALLHUB_`-prefixed environment variables, nested keys split on `__`.
//!
//! Command-line flags are applied on top by the binary.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix for configuration environment variables.
pub const ENV_PREFIX: &str = "WALLHUB_";
/// Config file names looked for in the platform config directory.
pub const CONFIG_FILE_NAMES: [&str; 4] = ["config.toml", "config.yaml", "config.yml", "config.json"];

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    /// Catalog root: holds the snapshot and the owned copies. Always absolute;
    /// relative values are taken against the working directory.
    pub library: PathBuf,
    /// Directories scanned for bundled engine packages. Never copied.
    pub bundled: Vec<PathBuf>,
    /// A `tracing` filter directive, e.g. `info` or `wallhub_catalog=debug`.
    /// When unset, `RUST_LOG` decides.
    pub log_level: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Layered {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    library: Option<PathBuf>,
    #[serde(default)]
    bundled: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    log_level: Option<String>,
}

impl Config {
    /// Load from defaults, the config file and the environment.
    ///
    /// An explicit file must exist; the default config file is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::from_figment(Self::figment(explicit)?)
    }

    /// The layered providers [`load`](Self::load) extracts from.
    pub fn figment(explicit: Option<&Path>) -> Result<Figment> {
        let dirs = ProjectDirs::from("", "", "WallpaperHub");
        let defaults = Layered {
            library: dirs.as_ref().map(|dirs| dirs.data_dir().join("library")),
            ..Default::default()
        };
        let mut figment = Figment::from(Serialized::defaults(defaults));

        let file = match explicit {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => dirs.and_then(|dirs| default_file(dirs.config_dir())),
        };
        if let Some(file) = file {
            tracing::debug!(file = %file.display(), "reading config file");
            figment = merge_file(figment, &file)?;
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Extract a configuration from any set of providers.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let layered: Layered = figment
            .extract()
            .map_err(|err| ErrorKind::Invalid(err.to_string()))?;
        let Some(library) = layered.library else {
            exn::bail!(ErrorKind::NoLibrary);
        };
        Ok(Self {
            library: absolute(&library)?,
            bundled: layered.bundled,
            log_level: layered.log_level,
        })
    }
}

/// Make a configured path absolute against the working directory, without
/// touching the filesystem.
pub fn absolute(path: &Path) -> Result<PathBuf> {
    Ok(std::path::absolute(path).map_err(|err| ErrorKind::Invalid(format!("{}: {err}", path.display())))?)
}

fn default_file(config_dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES.iter().map(|name| config_dir.join(name)).find(|path| path.is_file())
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
    Ok(match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
        Some("json") => figment.merge(Json::file(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;

    #[test]
    fn from_providers() {
        let figment = Figment::new().merge(Toml::string(
            r#"
            library = "/srv/wallpapers"
            bundled = ["/opt/wallhub/bundled"]
            "#,
        ));
        let config = Config::from_figment(figment).unwrap();
        assert_eq!(config.library, PathBuf::from("/srv/wallpapers"));
        assert_eq!(config.bundled, vec![PathBuf::from("/opt/wallhub/bundled")]);
        assert_eq!(config.log_level, None);
    }

    #[test]
    fn later_layers_win() {
        let figment = Figment::new()
            .merge(Serialized::defaults(Layered {
                library: Some("/default".into()),
                log_level: Some("warn".into()),
                ..Default::default()
            }))
            .merge(Json::string(r#"{"log_level": "wallhub_catalog=debug"}"#));
        let config = Config::from_figment(figment).unwrap();
        assert_eq!(config.library, PathBuf::from("/default"));
        assert_eq!(config.log_level.as_deref(), Some("wallhub_catalog=debug"));
    }

    #[test]
    fn relative_library_is_made_absolute() {
        let figment = Figment::new().merge(Toml::string(r#"library = "wallpapers/library""#));
        let config = Config::from_figment(figment).unwrap();
        assert!(config.library.is_absolute());
        assert_eq!(config.library, std::env::current_dir().unwrap().join("wallpapers/library"));
    }

    #[test]
    fn empty_library_is_invalid() {
        let err = absolute(Path::new("")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)));
    }

    #[test]
    fn library_is_required() {
        let err = Config::from_figment(Figment::new()).unwrap_err();
        assert_eq!(*err, ErrorKind::NoLibrary);
    }

    #[test]
    fn wrong_types_are_invalid() {
        let figment = Figment::new().merge(Toml::string(r#"library = "/x"
bundled = 3"#));
        let err = Config::from_figment(figment).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)));
    }

    #[rstest]
    #[case("wallhub.toml", "library = \"/from/toml\"\n")]
    #[case("wallhub.yaml", "library: /from/yaml\n")]
    #[case("wallhub.YML", "library: /from/yaml\n")]
    #[case("wallhub.json", "{\"library\": \"/from/json\"}")]
    fn explicit_file_formats(#[case] name: &str, #[case] contents: &str) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        let figment = merge_file(Figment::new(), &path).unwrap();
        let config = Config::from_figment(figment).unwrap();
        assert!(config.library.starts_with("/from"));
    }

    #[test]
    fn explicit_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let err = Config::figment(Some(&missing)).unwrap_err();
        assert_eq!(*err, ErrorKind::NotFound(missing));
    }

    #[test]
    fn unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        fs::write(&path, "library=/x").unwrap();
        let err = Config::figment(Some(&path)).unwrap_err();
        assert_eq!(*err, ErrorKind::UnsupportedFormat(path));
    }

    #[test]
    fn default_file_lookup_order() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(default_file(dir.path()), None);
        fs::write(dir.path().join("config.json"), "{}").unwrap();
        fs::write(dir.path().join("config.yaml"), "").unwrap();
        assert_eq!(default_file(dir.path()), Some(dir.path().join("config.yaml")));
    }
}

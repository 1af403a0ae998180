//! Decoded view of an engine package directory.

use crate::container::Container;
use crate::error::{ErrorKind, Result};
use crate::manifest::{Manifest, Property};
use crate::scene::Scene;
use crate::{CONTAINER_FILE, MANIFEST_FILE, manifest_path};
use std::hash::{Hash, Hasher};
use std::path::{Component, Path, PathBuf};
use tracing::instrument;

/// An engine package as found on disk.
///
/// Never persisted: it is rebuilt from the package directory whenever it is
/// needed. Two descriptors are the same package when they share both the
/// manifest path and the container path.
#[derive(Debug, Clone)]
pub struct PackageDescriptor {
    directory: PathBuf,
    /// Where the manifest was read from. For packed packages this is the
    /// would-be loose location and [`manifest_packed`](Self::manifest_packed) is set.
    pub manifest_path: PathBuf,
    pub manifest_packed: bool,
    pub container_path: Option<PathBuf>,
    pub preview_path: Option<PathBuf>,
    pub manifest: Manifest,
}

impl PackageDescriptor {
    /// Load the package in `directory`.
    ///
    /// The loose manifest wins; without one, the container's own manifest
    /// entry is used.
    ///
    /// # Errors
    ///
    /// [`NotFound`](ErrorKind::NotFound) when neither a loose nor a packed
    /// manifest exists, plus whatever decoding the manifest or container
    /// raises.
    #[instrument(level = "debug", fields(title))]
    pub fn load(directory: &Path) -> Result<Self> {
        let container_path = Some(directory.join(CONTAINER_FILE)).filter(|path| path.is_file());

        let (manifest_path, manifest, manifest_packed) = match manifest_path(directory) {
            Some(path) => {
                let manifest = Manifest::load(&path)?;
                (path, manifest, false)
            },
            None => {
                let loose = directory.join(MANIFEST_FILE);
                let Some(container) = &container_path else {
                    exn::bail!(ErrorKind::NotFound(loose));
                };
                let Some(bytes) = Container::open(container)?.extract_named(MANIFEST_FILE)? else {
                    exn::bail!(ErrorKind::NotFound(loose));
                };
                (loose, Manifest::from_slice(&bytes)?, true)
            },
        };
        tracing::Span::current().record("title", manifest.title.as_str());

        let preview_path = manifest
            .preview_file
            .as_deref()
            .and_then(|name| safe_join(directory, name))
            .filter(|path| path.is_file());

        Ok(Self {
            directory: directory.to_path_buf(),
            manifest_path,
            manifest_packed,
            container_path,
            preview_path,
            manifest,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn name(&self) -> &str {
        &self.manifest.title
    }

    pub fn kind(&self) -> Option<&str> {
        self.manifest.kind.as_deref()
    }

    pub fn workshop_id(&self) -> Option<&str> {
        self.manifest.workshop_id.as_deref()
    }

    /// Short multi-line description for display.
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Name: {}", self.name()),
            format!("Type: {}", self.kind().unwrap_or("unknown")),
        ];
        if let Some(id) = self.workshop_id() {
            lines.push(format!("Workshop ID: {id}"));
        }
        if let Some(description) = &self.manifest.description {
            lines.push(format!("Description: {description}"));
        }
        lines.iter().map(|line| format!("{line}\n")).collect()
    }

    /// Properties a user can change, in key order.
    pub fn configurable_properties(&self) -> impl Iterator<Item = (&str, &Property)> {
        self.manifest
            .properties
            .iter()
            .filter(|(_, property)| property.is_configurable())
            .map(|(key, property)| (key.as_str(), property))
    }

    /// Read the scene named by the manifest's `file`, loose or packed.
    ///
    /// Returns `None` for packages without a JSON scene file (video and web
    /// packages) or when the file exists in neither place.
    pub fn scene(&self) -> Result<Option<Scene>> {
        let Some(file) = self.manifest.file.as_deref().filter(|file| file.ends_with(".json")) else {
            return Ok(None);
        };
        if let Some(path) = safe_join(&self.directory, file)
            && path.is_file()
        {
            let bytes = std::fs::read(&path).map_err(|e| ErrorKind::from_io(&e, &path))?;
            return Scene::from_slice(&bytes).map(Some);
        }
        let Some(container) = &self.container_path else {
            return Ok(None);
        };
        match Container::open(container)?.extract_named(file)? {
            Some(bytes) => Scene::from_slice(&bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Make sure the preview named by the manifest exists as a loose file.
    ///
    /// A preview that only exists inside the container is extracted next to
    /// it, and [`preview_path`](Self::preview_path) is updated.
    #[instrument(level = "debug", skip(self), fields(package = %self.directory.display()))]
    pub fn extract_preview(&mut self) -> Result<Option<&Path>> {
        if self.preview_path.is_none()
            && let Some(name) = self.manifest.preview_file.as_deref()
            && let Some(target) = safe_join(&self.directory, name)
            && let Some(container) = &self.container_path
            && let Some(bytes) = Container::open(container)?.extract_named(name)?
        {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| ErrorKind::from_io(&e, parent))?;
            }
            std::fs::write(&target, bytes).map_err(|e| ErrorKind::from_io(&e, &target))?;
            tracing::debug!(preview = %target.display(), "extracted packed preview");
            self.preview_path = Some(target);
        }
        Ok(self.preview_path.as_deref())
    }
}

impl PartialEq for PackageDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.manifest_path == other.manifest_path && self.container_path == other.container_path
    }
}

impl Eq for PackageDescriptor {}

impl Hash for PackageDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.manifest_path.hash(state);
        self.container_path.hash(state);
    }
}

/// Join a manifest-provided relative name onto the package directory,
/// refusing anything that could point outside of it.
fn safe_join(directory: &Path, name: &str) -> Option<PathBuf> {
    let relative = Path::new(name);
    let mut components = relative.components().peekable();
    components.peek()?;
    if components.all(|component| matches!(component, Component::Normal(_))) {
        Some(directory.join(relative))
    } else {
        tracing::debug!(name, "ignoring package path that escapes the package directory");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ContainerWriter;
    use rstest::rstest;
    use std::fs;

    fn loose_package(dir: &Path, manifest: &str) {
        fs::write(dir.join("project.json"), manifest).unwrap();
        fs::write(dir.join("scene.pkg"), b"").unwrap();
    }

    #[test]
    fn loads_loose_package() {
        let dir = tempfile::tempdir().unwrap();
        loose_package(dir.path(), r#"{"title":"Demo","type":"Scene","preview":"preview.jpg"}"#);
        fs::write(dir.path().join("preview.jpg"), b"jpeg").unwrap();

        let package = PackageDescriptor::load(dir.path()).unwrap();
        assert_eq!(package.name(), "Demo");
        assert_eq!(package.kind(), Some("Scene"));
        assert!(!package.manifest_packed);
        assert_eq!(package.manifest_path, dir.path().join("project.json"));
        assert_eq!(package.container_path, Some(dir.path().join("scene.pkg")));
        assert_eq!(package.preview_path, Some(dir.path().join("preview.jpg")));
    }

    #[test]
    fn missing_preview_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        loose_package(dir.path(), r#"{"title":"Demo","preview":"preview.gif"}"#);
        let package = PackageDescriptor::load(dir.path()).unwrap();
        assert_eq!(package.preview_path, None);
    }

    #[test]
    fn manifest_alias_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("manifest.json"), r#"{"title":"Alias"}"#).unwrap();
        let package = PackageDescriptor::load(dir.path()).unwrap();
        assert_eq!(package.name(), "Alias");
        assert_eq!(package.manifest_path, dir.path().join("manifest.json"));
        assert_eq!(package.container_path, None);
    }

    #[test]
    fn packed_manifest_and_scene() {
        let dir = tempfile::tempdir().unwrap();
        ContainerWriter::new()
            .stored("project.json", br#"{"title":"Packed","file":"scene.json","preview":"preview.png"}"#.to_vec())
            .compressed("scene.json", br#"{"orthogonalprojection":{"width":3840,"height":2160}}"#)
            .unwrap()
            .stored("preview.png", b"png bytes".to_vec())
            .write(dir.path().join("scene.pkg"))
            .unwrap();

        let mut package = PackageDescriptor::load(dir.path()).unwrap();
        assert_eq!(package.name(), "Packed");
        assert!(package.manifest_packed);
        assert_eq!(package.preview_path, None);
        assert_eq!(package.scene().unwrap().unwrap().resolution(), Some((3840, 2160)));

        let preview = package.extract_preview().unwrap().unwrap().to_path_buf();
        assert_eq!(preview, dir.path().join("preview.png"));
        assert_eq!(fs::read(&preview).unwrap(), b"png bytes");
        // Reloading now finds the loose copy.
        assert_eq!(PackageDescriptor::load(dir.path()).unwrap().preview_path, Some(preview));
    }

    #[test]
    fn no_manifest_anywhere() {
        let dir = tempfile::tempdir().unwrap();
        let err = PackageDescriptor::load(dir.path()).unwrap_err();
        assert_eq!(*err, ErrorKind::NotFound(dir.path().join("project.json")));

        ContainerWriter::new().stored("scene.json", b"{}".to_vec()).write(dir.path().join("scene.pkg")).unwrap();
        let err = PackageDescriptor::load(dir.path()).unwrap_err();
        assert_eq!(*err, ErrorKind::NotFound(dir.path().join("project.json")));
    }

    #[test]
    fn loose_scene_preferred() {
        let dir = tempfile::tempdir().unwrap();
        loose_package(dir.path(), r#"{"title":"Loose","file":"scene.json"}"#);
        fs::write(dir.path().join("scene.json"), r#"{"orthogonalprojection":{"width":1280,"height":720}}"#).unwrap();
        let package = PackageDescriptor::load(dir.path()).unwrap();
        assert_eq!(package.scene().unwrap().unwrap().resolution(), Some((1280, 720)));
    }

    #[test]
    fn video_package_has_no_scene() {
        let dir = tempfile::tempdir().unwrap();
        loose_package(dir.path(), r#"{"title":"Clip","type":"video","file":"clip.mp4"}"#);
        let package = PackageDescriptor::load(dir.path()).unwrap();
        assert!(package.scene().unwrap().is_none());
    }

    #[test]
    fn summary_and_properties() {
        let dir = tempfile::tempdir().unwrap();
        loose_package(
            dir.path(),
            r#"{"title":"Rain","type":"scene","workshopid":"42","description":"Wet",
                "general":{"properties":{"rate":{"type":"slider","value":3},"heading":{"type":"group"}}}}"#,
        );
        let package = PackageDescriptor::load(dir.path()).unwrap();
        assert_eq!(package.summary(), "Name: Rain\nType: scene\nWorkshop ID: 42\nDescription: Wet\n");
        let keys: Vec<_> = package.configurable_properties().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["rate"]);
    }

    #[test]
    fn summary_skips_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        loose_package(dir.path(), r#"{"title":"Plain"}"#);
        let package = PackageDescriptor::load(dir.path()).unwrap();
        assert_eq!(package.summary(), "Name: Plain\nType: unknown\n");
    }

    #[test]
    fn identity_is_manifest_and_container() {
        let dir = tempfile::tempdir().unwrap();
        loose_package(dir.path(), r#"{"title":"A"}"#);
        let a = PackageDescriptor::load(dir.path()).unwrap();
        fs::write(dir.path().join("project.json"), r#"{"title":"B"}"#).unwrap();
        let b = PackageDescriptor::load(dir.path()).unwrap();
        assert_eq!(a, b);
    }

    #[rstest]
    #[case("preview.jpg", true)]
    #[case("media/preview.jpg", true)]
    #[case("../preview.jpg", false)]
    #[case("/etc/passwd", false)]
    #[case("./preview.jpg", false)]
    #[case("", false)]
    fn join_stays_inside(#[case] name: &str, #[case] ok: bool) {
        assert_eq!(safe_join(Path::new("/library/pkg"), name).is_some(), ok);
    }
}

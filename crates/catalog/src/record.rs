//! Catalog record types.

use derive_more::Display;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display as FmtDisplay, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;
use wallhub_package::PackageDescriptor;

/// Opaque, never reused record identifier.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(Uuid);

impl AssetId {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl FromStr for AssetId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// What kind of asset a record holds.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetType {
    #[display("Static Image")]
    #[serde(rename = "Static Image")]
    StaticImage,
    #[display("Animated Image")]
    #[serde(rename = "Animated Image")]
    AnimatedImage,
    #[display("Video")]
    #[serde(rename = "Video")]
    Video,
    #[display("Engine Package")]
    #[serde(rename = "Engine Package")]
    EnginePackage,
}

/// Pixel dimensions, written as `"W × H"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl From<(u32, u32)> for Resolution {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

impl FmtDisplay for Resolution {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} × {}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = String;

    /// Accepts `"1920 × 1080"` as well as `"1920x1080"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (width, height) = s
            .split_once('×')
            .or_else(|| s.split_once(['x', 'X']))
            .ok_or_else(|| format!("not a resolution: {s:?}"))?;
        let parse = |part: &str| part.trim().parse::<u32>().map_err(|_| format!("not a resolution: {s:?}"));
        Ok(Self { width: parse(width)?, height: parse(height)? })
    }
}

impl Serialize for Resolution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Resolution {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(D::Error::custom)
    }
}

/// One cataloged asset.
///
/// The package descriptor is never persisted; it is re-derived from disk
/// whenever the record is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub id: AssetId,
    #[serde(rename = "name")]
    pub display_name: String,
    /// Location of the catalog's copy (or, for records that aren't owned, of
    /// the asset itself).
    #[serde(rename = "path")]
    pub source_path: PathBuf,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    #[serde(with = "rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, deserialize_with = "lenient_resolution")]
    pub resolution: Option<Resolution>,
    pub byte_size: u64,
    /// Whether the catalog owns (and may delete) the files at `source_path`.
    #[serde(default = "owned_by_default")]
    pub owned: bool,
    #[serde(skip)]
    pub package: Option<PackageDescriptor>,
}

impl AssetRecord {
    /// The file to hand to the desktop for use as a background.
    ///
    /// Engine packages can't be set directly, so their preview is used;
    /// a package without a known preview has no apply target.
    pub fn apply_target(&self) -> Option<&Path> {
        match self.asset_type {
            AssetType::EnginePackage => self.package.as_ref()?.preview_path.as_deref(),
            _ => Some(&self.source_path),
        }
    }
}

fn owned_by_default() -> bool {
    true
}

// An unreadable resolution means "unknown", not a broken snapshot.
fn lenient_resolution<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Resolution>, D::Error> {
    let text = Option::<String>::deserialize(deserializer)?;
    Ok(text.and_then(|text| text.parse().ok()))
}

mod rfc3339 {
    use serde::de::Error as _;
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use time::OffsetDateTime;
    use time::format_description::well_known::Rfc3339;

    pub fn serialize<S: Serializer>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        let text = value.format(&Rfc3339).map_err(S::Error::custom)?;
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<OffsetDateTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        OffsetDateTime::parse(&text, &Rfc3339).map_err(D::Error::custom)
    }
}

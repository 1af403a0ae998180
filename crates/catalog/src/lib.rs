//! The wallpaper asset catalog.
//!
//! Assets are classified ([`classify`]), copied into a library root, probed
//! for their resolution ([`probe`]) and recorded in a JSON snapshot that
//! survives restarts ([`Catalog`]). Engine packages are decoded with
//! `wallhub-package` so the catalog can show their title and apply their
//! preview.

mod apply;
mod classify;
pub mod error;
pub mod probe;
mod record;
mod snapshot;
mod store;

pub use crate::apply::{DesktopSetter, DisplayScope, SetterError};
pub use crate::classify::{ANIMATED_EXTENSIONS, VIDEO_EXTENSIONS, classify};
pub use crate::probe::{DefaultProbe, MediaProbe};
pub use crate::record::{AssetId, AssetRecord, AssetType, Resolution};
pub use crate::snapshot::SNAPSHOT_FILE;
pub use crate::store::{ASSET_DIR, Catalog};

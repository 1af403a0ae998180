//! Catalog snapshot encoding.
//!
//! The snapshot is a JSON array of records in catalog order. Package
//! descriptors are skipped on write and rebuilt on load.

use crate::error::{ErrorKind, Result};
use crate::record::AssetRecord;
use exn::ResultExt;

/// Snapshot file name, relative to the library root.
pub const SNAPSHOT_FILE: &str = "metadata.json";

pub(crate) fn encode(records: &[AssetRecord]) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(records).or_raise(|| ErrorKind::Snapshot)
}

/// Decode a snapshot. An empty file is an empty catalog.
pub(crate) fn decode(bytes: &[u8]) -> Result<Vec<AssetRecord>> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    serde_json::from_slice(bytes).or_raise(|| ErrorKind::Snapshot)
}

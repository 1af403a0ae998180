//! Catalog Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. A failed ingest never leaves a half-added record
//! behind, so every kind here means "the catalog is unchanged".

use crate::record::AssetId;
use derive_more::{Display, Error};
use std::path::PathBuf;
use wallhub_package::error::{Error as PackageError, ErrorKind as PackageErrorKind};
use wallhub_storage::error::{Error as StorageError, ErrorKind as StorageErrorKind};

/// A catalog error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The path handed to the catalog (or an asset's apply target) doesn't exist.
    #[display("not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// No record has this id.
    #[display("unknown asset: {_0}")]
    UnknownAsset(#[error(not(source))] AssetId),
    /// The path exists but can't be cataloged (inside the library, no file
    /// name, or a plain directory that isn't an engine package).
    #[display("cannot catalog {}", _0.display())]
    InvalidSource(#[error(not(source))] PathBuf),
    /// The engine package's manifest or container couldn't be decoded.
    #[display("engine package error: {_0}")]
    Package(PackageErrorKind),
    /// Copying into the library failed. Nothing was left behind.
    #[display("copying into the library failed")]
    CopyFailed,
    /// Any other library storage failure.
    #[display("library storage error")]
    Storage,
    /// The snapshot couldn't be read, decoded or written.
    #[display("catalog snapshot error")]
    Snapshot,
    /// The desktop collaborator failed to apply the background.
    #[display("failed to apply background")]
    Apply,
}

impl ErrorKind {
    /// Convert a package error into a catalog error, keeping the package
    /// crate's `Exn` frame as a child in the error tree.
    #[track_caller]
    pub fn package(err: PackageError) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Package(inner))
    }

    /// Convert a storage error into a catalog error, keeping the storage
    /// crate's `Exn` frame as a child in the error tree.
    #[track_caller]
    pub fn storage(err: StorageError) -> Error {
        let kind = match &*err {
            StorageErrorKind::CopyFailed(_) => ErrorKind::CopyFailed,
            _ => ErrorKind::Storage,
        };
        err.raise(kind)
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Package(inner) => inner.is_retryable(),
            Self::CopyFailed | Self::Storage | Self::Apply => true,
            _ => false,
        }
    }
}

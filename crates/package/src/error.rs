//! Package Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. Every offset, size and count read from a container is
//! third-party input, so malformed data always surfaces as one of these kinds
//! and never as a panic.

use derive_more::{Display, Error};
use std::path::{Path, PathBuf};

/// A package error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for package operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// An expected file (manifest, container) or container entry is missing.
    #[display("not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// The file is not a package container at all.
    #[display("unrecognized container magic: {_0:02x?}")]
    BadMagic(#[error(not(source))] [u8; 4]),
    /// The file is a package container, but of a version this decoder can't read.
    #[display("unsupported container version: {_0}")]
    UnsupportedVersion(#[error(not(source))] u32),
    /// The header or entry table ends before its declared contents.
    #[display("container is truncated")]
    Truncated,
    /// An entry's payload would lie (partly) outside of the container.
    #[display("entry out of bounds: {size} bytes at offset {offset} exceeds container length {length}")]
    OutOfBounds { offset: u64, size: u64, length: u64 },
    /// A compressed payload could not be decoded to its declared size.
    #[display("entry decompression failed")]
    DecompressionFailed,
    /// Structurally invalid manifest, scene or entry table.
    #[display("malformed package data: {_0}")]
    Malformed(#[error(not(source))] String),
    /// Underlying I/O error.
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Package content is either valid or it's not.
        matches!(self, Self::Io)
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    /// Categorise a failed read from an already opened container.
    pub(crate) fn from_read(err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof => Self::Truncated,
            _ => Self::Io,
        }
    }

    pub(crate) fn from_io(err: &std::io::Error, path: &Path) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            _ => Self::from_read(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::BadMagic(*b"PK\x03\x04").to_string(), "unrecognized container magic: [50, 4b, 03, 04]");
        assert_eq!(ErrorKind::UnsupportedVersion(7).to_string(), "unsupported container version: 7");
        assert_eq!(
            ErrorKind::OutOfBounds { offset: 10, size: 20, length: 25 }.to_string(),
            "entry out of bounds: 20 bytes at offset 10 exceeds container length 25"
        );
    }

    #[test]
    fn error_from_io() {
        let path = Path::new("/packages/123/scene.pkg");
        let missing = std::io::Error::from(std::io::ErrorKind::NotFound);
        assert_eq!(ErrorKind::from_io(&missing, path), ErrorKind::NotFound(path.to_path_buf()));
        let short = std::io::Error::from(std::io::ErrorKind::UnexpectedEof);
        assert_eq!(ErrorKind::from_io(&short, path), ErrorKind::Truncated);
        let other = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert_eq!(ErrorKind::from_io(&other, path), ErrorKind::Io);
    }
}

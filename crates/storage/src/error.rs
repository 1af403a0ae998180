//! Storage Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::{Path, PathBuf};

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// File or directory does not exist
    #[display("file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Access denied
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    /// Path contains invalid characters or escapes root
    #[display("invalid path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// Copying into the library failed; any partial copy has been removed
    #[display("copy failed: {}", _0.display())]
    CopyFailed(#[error(not(source))] PathBuf),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::CopyFailed(_))
    }

    pub(crate) fn from_io(err: IoError, path: &Path) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(
            ErrorKind::CopyFailed(PathBuf::from("/library/wallpapers/a.png")).to_string(),
            "copy failed: /library/wallpapers/a.png"
        );
        assert_eq!(ErrorKind::InvalidPath(PathBuf::from("../x")).to_string(), "invalid path: ../x");
    }

    #[test]
    fn error_from_io() {
        let path = Path::new("/library/a.png");
        let kind = ErrorKind::from_io(IoError::from(std::io::ErrorKind::NotFound), path);
        assert!(matches!(kind, ErrorKind::NotFound(p) if p == path));
        let kind = ErrorKind::from_io(IoError::from(std::io::ErrorKind::PermissionDenied), path);
        assert!(matches!(kind, ErrorKind::PermissionDenied(_)));
        let kind = ErrorKind::from_io(IoError::other("disk on fire"), path);
        assert!(kind.is_retryable());
    }
}

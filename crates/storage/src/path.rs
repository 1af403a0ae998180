//! Library-relative name validation.
//!
//! The catalog only ever names things like `metadata.json` or
//! `wallpapers/<file name>`, where the file name comes from whatever the user
//! dropped on the library. Names are checked as given and never rewritten, so
//! a name that needs cleaning up is a bug in the caller.

use crate::error::{ErrorKind, Result};
use std::path::{Component, Path, PathBuf};

/// Check that `path` is a plain relative name below the library root.
///
/// Every component must be a normal file or directory name: `.`, `..`, a
/// leading `/`, drive prefixes, null bytes and empty names are refused.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use wallhub_storage::validate_path;
///
/// assert_eq!(validate_path("wallpapers/beach.jpg").unwrap(), Path::new("wallpapers/beach.jpg"));
/// assert!(validate_path("wallpapers/../beach.jpg").is_err());
/// assert!(validate_path("/metadata.json").is_err());
/// assert!(validate_path("wallpapers/\0").is_err());
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let mut components = path.components().peekable();
    if components.peek().is_none() {
        exn::bail!(ErrorKind::InvalidPath(path.to_path_buf()));
    }
    for component in components {
        let Component::Normal(name) = component else {
            exn::bail!(ErrorKind::InvalidPath(path.to_path_buf()));
        };
        // Null bytes pass through Path::components() on Unix but truncate in syscalls.
        if name.as_encoded_bytes().contains(&0) {
            exn::bail!(ErrorKind::InvalidPath(path.to_path_buf()));
        }
    }
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("metadata.json")]
    #[case("wallpapers/beach.jpg")]
    #[case("wallpapers/Ocean Waves")]
    #[case("wallpapers/1234567890")]
    #[case("wallpapers/.hidden.png")]
    fn accepted(#[case] input: &str) {
        assert_eq!(validate(input).unwrap(), Path::new(input));
    }

    #[rstest]
    #[case("")]
    #[case(".")]
    #[case("..")]
    #[case("./wallpapers/beach.jpg")]
    #[case("../metadata.json")]
    #[case("wallpapers/../metadata.json")]
    #[case("wallpapers/../../etc")]
    #[case("/metadata.json")]
    #[case("//")]
    #[case("a\0b")]
    fn rejected(#[case] input: &str) {
        let err = validate(input).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(p) if p == Path::new(input)));
    }
}

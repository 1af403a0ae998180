//! Engine package decoding.
//!
//! An engine package is a directory holding a project manifest, a binary
//! container of (optionally compressed) named entries, and usually some loose
//! preview or media files. This crate provides:
//!
//! - **Container decoding** ([`container`]): listing and extracting entries,
//!   with every offset and count bounds-checked before use.
//! - **Manifest model** ([`manifest`]): the project description and its
//!   dynamically typed properties.
//! - **Scene model** ([`scene`]): the parts of `scene.json` used for browsing.
//! - **Package descriptor** ([`PackageDescriptor`]): all of the above resolved
//!   for one package directory.
//!
//! Enable the `writer` feature for [`container::ContainerWriter`].

pub mod container;
mod descriptor;
pub mod error;
pub mod manifest;
pub mod scene;

pub use descriptor::PackageDescriptor;

use std::path::{Path, PathBuf};

/// Primary manifest file name.
pub const MANIFEST_FILE: &str = "project.json";
/// Every manifest file name accepted, in order of preference.
pub const MANIFEST_FILE_NAMES: [&str; 2] = [MANIFEST_FILE, "manifest.json"];
/// Container file name.
pub const CONTAINER_FILE: &str = "scene.pkg";

/// Whether `path` looks like an engine package: a manifest and a container
/// directly inside it.
///
/// Only checks that the files exist; neither is opened.
///
/// # Examples
///
/// ```
/// use wallhub_package::is_package_directory;
///
/// let dir = tempfile::tempdir().unwrap();
/// assert!(!is_package_directory(dir.path()));
/// std::fs::write(dir.path().join("project.json"), b"not even json").unwrap();
/// std::fs::write(dir.path().join("scene.pkg"), b"").unwrap();
/// assert!(is_package_directory(dir.path()));
/// ```
pub fn is_package_directory(path: &Path) -> bool {
    manifest_path(path).is_some() && path.join(CONTAINER_FILE).is_file()
}

/// The manifest file inside `directory`, if there is one.
pub fn manifest_path(directory: &Path) -> Option<PathBuf> {
    MANIFEST_FILE_NAMES
        .iter()
        .map(|name| directory.join(name))
        .find(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;

    #[rstest]
    #[case(&[], false)]
    #[case(&["project.json"], false)]
    #[case(&["scene.pkg"], false)]
    #[case(&["project.json", "scene.pkg"], true)]
    #[case(&["manifest.json", "scene.pkg"], true)]
    #[case(&["scene.json", "scene.pkg"], false)]
    fn package_directory(#[case] files: &[&str], #[case] expected: bool) {
        let dir = tempfile::tempdir().unwrap();
        for file in files {
            fs::write(dir.path().join(file), b"").unwrap();
        }
        assert_eq!(is_package_directory(dir.path()), expected);
    }

    #[test]
    fn manifest_named_directory_does_not_count() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("project.json")).unwrap();
        fs::write(dir.path().join("scene.pkg"), b"").unwrap();
        assert!(!is_package_directory(dir.path()));
    }

    #[test]
    fn primary_manifest_preferred() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("manifest.json"), b"").unwrap();
        assert_eq!(manifest_path(dir.path()), Some(dir.path().join("manifest.json")));
        fs::write(dir.path().join("project.json"), b"").unwrap();
        assert_eq!(manifest_path(dir.path()), Some(dir.path().join("project.json")));
    }

    #[test]
    fn not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("image.png");
        fs::write(&file, b"").unwrap();
        assert!(!is_package_directory(&file));
    }
}

//! Local filesystem store.

use crate::error::{ErrorKind, Result};
use crate::path::validate as validate_path;
use exn::{OptionExt, ResultExt};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};
use tracing::instrument;
use walkdir::WalkDir;

/// Prefix of the staging directories created below the root.
pub const STAGING_PREFIX: &str = ".staging-";
const INCOMING: &str = "incoming";
const PREVIOUS: &str = "previous";

/// A directory on the local filesystem that owns copies of assets.
///
/// Names passed in are relative to the root and validated, so a store never
/// writes outside of its root.
///
/// # Examples
///
/// ```no_run
/// use wallhub_storage::LocalStore;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = LocalStore::new("/home/me/.local/share/wallhub/library")?;
/// let staged = store.stage_file("/home/me/Pictures/beach.jpg".as_ref(), "wallpapers/beach.jpg")?;
/// let placed = store.place(staged)?;
/// println!("{}", placed.path().display());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Open (creating if needed) the store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPath`](ErrorKind::InvalidPath) if the path is not
    /// absolute or exists but isn't a directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root.to_path_buf()));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidPath(root.to_path_buf()));
            }
        } else {
            fs::create_dir_all(root).map_err(|e| ErrorKind::from_io(e, root))?;
        }
        // Canonical so that containment checks aren't fooled by symlinked parents.
        let root = fs::canonicalize(root).map_err(|e| ErrorKind::from_io(e, root))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path for a name relative to the root.
    pub fn resolve(&self, name: impl AsRef<Path>) -> Result<PathBuf> {
        Ok(self.root.join(validate_path(name)?))
    }

    /// Whether an absolute path lies inside the store.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.root) && path != self.root
    }

    /// Create a directory (and its parents) below the root.
    pub fn create_dir(&self, name: impl AsRef<Path>) -> Result<PathBuf> {
        let path = self.resolve(name)?;
        fs::create_dir_all(&path).map_err(|e| ErrorKind::from_io(e, &path))?;
        Ok(path)
    }

    /// Copy a single file into a staging area below the root, ready to be
    /// [`place`](Self::place)d at `name`.
    ///
    /// Dropping the returned [`Staged`] deletes the copy.
    #[instrument(level = "debug", skip(self), fields(bytes))]
    pub fn stage_file(&self, source: &Path, name: &str) -> Result<Staged> {
        let staged = self.staging(name)?;
        let bytes = fs::copy(source, &staged.path).or_raise(|| ErrorKind::CopyFailed(staged.destination.clone()))?;
        tracing::Span::current().record("bytes", bytes);
        Ok(staged)
    }

    /// Copy a directory tree into a staging area below the root, ready to be
    /// [`place`](Self::place)d at `name`.
    ///
    /// Symbolic links are followed, so linked files and directories are
    /// copied as regular ones. A link that can't be resolved fails the copy.
    #[instrument(level = "debug", skip(self), fields(files))]
    pub fn stage_dir(&self, source: &Path, name: &str) -> Result<Staged> {
        let staged = self.staging(name)?;
        let files = copy_tree(source, &staged.path)?;
        tracing::Span::current().record("files", files);
        Ok(staged)
    }

    /// Move a staged copy to its destination, replacing whatever is there.
    ///
    /// The replaced item is kept aside until the returned [`Placed`] is
    /// dropped, so [`Placed::restore`] can put it back.
    #[instrument(level = "debug", skip(self, staged), fields(destination = %staged.destination.display(), replaced))]
    pub fn place(&self, staged: Staged) -> Result<Placed> {
        let Staged { dir, path, destination } = staged;
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| ErrorKind::from_io(e, parent))?;
        }
        let previous = match fs::symlink_metadata(&destination) {
            Ok(_) => {
                let backup = dir.path().join(PREVIOUS);
                fs::rename(&destination, &backup).map_err(|e| ErrorKind::from_io(e, &destination))?;
                Some(backup)
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => exn::bail!(ErrorKind::from_io(e, &destination)),
        };
        tracing::Span::current().record("replaced", previous.is_some());
        if let Err(err) = fs::rename(&path, &destination) {
            if let Some(backup) = &previous
                && let Err(undo) = fs::rename(backup, &destination)
            {
                tracing::warn!(path = %destination.display(), error = %undo, "couldn't put the replaced copy back");
            }
            exn::bail!(ErrorKind::from_io(err, &destination));
        }
        Ok(Placed { destination, previous, _dir: dir })
    }

    /// Delete a file or directory tree inside the store.
    ///
    /// Returns `false` when there was nothing to delete.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPath`](ErrorKind::InvalidPath) for paths outside of the store.
    pub fn remove(&self, path: &Path) -> Result<bool> {
        if !self.contains(path) {
            exn::bail!(ErrorKind::InvalidPath(path.to_path_buf()));
        }
        Ok(delete(path).map_err(|e| ErrorKind::from_io(e, path))?)
    }

    /// Read a file, or `None` if it doesn't exist.
    pub fn read(&self, name: impl AsRef<Path>) -> Result<Option<Vec<u8>>> {
        let path = self.resolve(name)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => exn::bail!(ErrorKind::from_io(e, &path)),
        }
    }

    /// Replace the contents of `name` so that readers only ever see the old
    /// or the new contents.
    ///
    /// Data goes to a temporary file in the same directory, which is then
    /// renamed over the destination.
    #[instrument(level = "debug", skip(self, data), fields(bytes = data.len()))]
    pub fn write_atomic(&self, name: &str, data: &[u8]) -> Result<PathBuf> {
        let destination = self.resolve(name)?;
        let parent = destination.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent).map_err(|e| ErrorKind::from_io(e, parent))?;

        let mut temp = NamedTempFile::new_in(parent).map_err(|e| ErrorKind::from_io(e, parent))?;
        temp.write_all(data).map_err(ErrorKind::Io)?;
        temp.as_file().sync_all().map_err(ErrorKind::Io)?;
        temp.persist(&destination).map_err(|e| ErrorKind::from_io(e.error, &destination))?;
        Ok(destination)
    }

    fn staging(&self, name: &str) -> Result<Staged> {
        let destination = self.resolve(name)?;
        let file_name = destination.file_name().ok_or_raise(|| ErrorKind::InvalidPath(destination.clone()))?;
        let dir = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&self.root)
            .map_err(|e| ErrorKind::from_io(e, &self.root))?;
        let incoming = dir.path().join(INCOMING);
        fs::create_dir(&incoming).map_err(|e| ErrorKind::from_io(e, &incoming))?;
        let path = incoming.join(file_name);
        Ok(Staged { dir, path, destination })
    }
}

/// A copy waiting below the store's root to be moved into place.
///
/// It keeps the file name of its destination, so tools that look at the
/// extension see what they'll see once it's placed.
#[derive(Debug)]
pub struct Staged {
    dir: TempDir,
    path: PathBuf,
    destination: PathBuf,
}

impl Staged {
    /// Where the copy currently is.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where [`LocalStore::place`] will move it.
    pub fn destination(&self) -> &Path {
        &self.destination
    }
}

/// A copy moved into place, holding on to whatever it replaced.
#[derive(Debug)]
pub struct Placed {
    destination: PathBuf,
    previous: Option<PathBuf>,
    _dir: TempDir,
}

impl Placed {
    pub fn path(&self) -> &Path {
        &self.destination
    }

    /// Undo the placement: delete the new copy and put the replaced one back.
    pub fn restore(self) -> Result<()> {
        delete(&self.destination).map_err(|e| ErrorKind::from_io(e, &self.destination))?;
        if let Some(previous) = &self.previous {
            fs::rename(previous, &self.destination).map_err(|e| ErrorKind::from_io(e, &self.destination))?;
        }
        Ok(())
    }
}

/// Size in bytes of a file, or the recursive sum of the file sizes in a directory.
pub fn size_of(path: &Path) -> Result<u64> {
    let metadata = fs::metadata(path).map_err(|e| ErrorKind::from_io(e, path))?;
    if !metadata.is_dir() {
        return Ok(metadata.len());
    }
    let mut total = 0u64;
    for entry in WalkDir::new(path).follow_links(true) {
        let entry = entry.or_raise(|| ErrorKind::NotFound(path.to_path_buf()))?;
        if entry.file_type().is_file() {
            let metadata = entry.metadata().or_raise(|| ErrorKind::NotFound(entry.path().to_path_buf()))?;
            total = total.saturating_add(metadata.len());
        }
    }
    Ok(total)
}

fn copy_tree(source: &Path, destination: &Path) -> Result<usize> {
    let mut files = 0;
    for entry in WalkDir::new(source).follow_links(true) {
        let entry = entry.or_raise(|| ErrorKind::CopyFailed(destination.to_path_buf()))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .or_raise(|| ErrorKind::InvalidPath(entry.path().to_path_buf()))?;
        let target = destination.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).or_raise(|| ErrorKind::CopyFailed(target.clone()))?;
        } else {
            fs::copy(entry.path(), &target).or_raise(|| ErrorKind::CopyFailed(target.clone()))?;
            files += 1;
        }
    }
    Ok(files)
}

// Ok(false) when there was nothing to delete.
fn delete(path: &Path) -> std::io::Result<bool> {
    let removed = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    match removed {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

//! The persisted asset catalog.

use crate::apply::{DesktopSetter, DisplayScope};
use crate::classify::classify;
use crate::error::{ErrorKind, Result};
use crate::probe::{DefaultProbe, MediaProbe};
use crate::record::{AssetId, AssetRecord, AssetType, Resolution};
use crate::snapshot::{self, SNAPSHOT_FILE};
use exn::{OptionExt, ResultExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::instrument;
use wallhub_package::{PackageDescriptor, is_package_directory};
use wallhub_storage::{LocalStore, Placed, Staged, size_of};

/// Directory below the library root holding the catalog's own copies.
pub const ASSET_DIR: &str = "wallpapers";

/// The catalog of known assets, persisted below a library root:
///
/// ```text
/// <library>/metadata.json      snapshot of every record, in catalog order
/// <library>/wallpapers/<name>  owned copies of ingested files and packages
/// ```
///
/// Mutating operations take `&mut self`; callers serialise them. Readers
/// holding a [`list`](Self::list) keep seeing the sequence as it was when
/// they asked, because every mutation swaps in a new one.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use wallhub_catalog::Catalog;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut catalog = Catalog::open("/home/me/.local/share/wallhub/library")?;
/// let record = catalog.ingest(Path::new("/home/me/Pictures/beach.jpg"))?;
/// for asset in catalog.list().iter() {
///     println!("{} {} {}", asset.id, asset.asset_type, asset.display_name);
/// }
/// catalog.remove(record.id)?;
/// # Ok(())
/// # }
/// ```
pub struct Catalog {
    store: LocalStore,
    records: Arc<[AssetRecord]>,
    probe: Box<dyn MediaProbe>,
}

impl Catalog {
    /// Open the catalog at `root`, creating the library layout if needed,
    /// and load its snapshot.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        Self::with_probe(root, DefaultProbe)
    }

    /// Like [`open`](Self::open), with a custom media probe.
    pub fn with_probe(root: impl AsRef<Path>, probe: impl MediaProbe + 'static) -> Result<Self> {
        let store = LocalStore::new(root).map_err(ErrorKind::storage)?;
        store.create_dir(ASSET_DIR).map_err(ErrorKind::storage)?;
        let mut catalog = Self {
            store,
            records: Arc::from(Vec::new()),
            probe: Box::new(probe),
        };
        catalog.reload()?;
        Ok(catalog)
    }

    /// The (canonical) library root.
    pub fn root(&self) -> &Path {
        self.store.root()
    }

    /// Every record, in insertion order.
    pub fn list(&self) -> Arc<[AssetRecord]> {
        Arc::clone(&self.records)
    }

    pub fn get(&self, id: AssetId) -> Option<&AssetRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Re-read the snapshot from disk.
    ///
    /// Records whose files have disappeared are dropped silently, and engine
    /// packages get their descriptor rebuilt; a package that no longer
    /// decodes keeps its record without a descriptor. The snapshot itself is
    /// not rewritten. Returns the number of records dropped.
    ///
    /// # Errors
    ///
    /// [`Snapshot`](ErrorKind::Snapshot) when the snapshot exists but can't
    /// be read or decoded; the in-memory catalog is left as it was.
    #[instrument(skip(self), fields(root = %self.root().display(), records, pruned))]
    pub fn reload(&mut self) -> Result<usize> {
        let bytes = self.store.read(SNAPSHOT_FILE).or_raise(|| ErrorKind::Snapshot)?;
        let loaded = match bytes {
            Some(bytes) => snapshot::decode(&bytes)?,
            None => Vec::new(),
        };

        let total = loaded.len();
        let records: Vec<AssetRecord> = loaded
            .into_iter()
            .filter(|record| {
                let exists = record.source_path.exists();
                if !exists {
                    tracing::warn!(id = %record.id, path = %record.source_path.display(), "dropping record whose files are gone");
                }
                exists
            })
            .map(|mut record| {
                if record.asset_type == AssetType::EnginePackage {
                    record.package = load_descriptor(&record.source_path);
                }
                record
            })
            .collect();

        let pruned = total - records.len();
        tracing::Span::current().record("records", records.len());
        tracing::Span::current().record("pruned", pruned);
        self.records = Arc::from(records);
        Ok(pruned)
    }

    /// Copy `source` into the library and catalog it.
    ///
    /// Files are copied to `wallpapers/<file name>`, engine package
    /// directories as a whole tree. A previous copy with the same name is
    /// overwritten and its record replaced by the new one, which is appended
    /// at the end.
    ///
    /// The copy is staged and described before it replaces anything, so on
    /// any failure the catalog and the library's files are as they were.
    #[instrument(skip(self), fields(asset_type, id))]
    pub fn ingest(&mut self, source: &Path) -> Result<AssetRecord> {
        if !source.exists() {
            exn::bail!(ErrorKind::NotFound(source.to_path_buf()));
        }
        let source = source.canonicalize().or_raise(|| ErrorKind::NotFound(source.to_path_buf()))?;
        if source.starts_with(self.root()) {
            exn::bail!(ErrorKind::InvalidSource(source));
        }
        let Some(file_name) = source.file_name().and_then(|name| name.to_str()) else {
            exn::bail!(ErrorKind::InvalidSource(source));
        };
        let name = format!("{ASSET_DIR}/{file_name}");

        let asset_type = classify(&source);
        tracing::Span::current().record("asset_type", tracing::field::display(asset_type));
        let (staged, mut record) = match asset_type {
            AssetType::EnginePackage => self.stage_package(&source, &name)?,
            _ if source.is_dir() => exn::bail!(ErrorKind::InvalidSource(source.clone())),
            _ => self.stage_file(&source, &name, file_name, asset_type)?,
        };
        tracing::Span::current().record("id", tracing::field::display(record.id));

        let placed = self.store.place(staged).map_err(ErrorKind::storage)?;
        if asset_type == AssetType::EnginePackage {
            // Descriptor paths must point at the placed copy, not the staging area.
            match PackageDescriptor::load(placed.path()) {
                Ok(package) => record.package = Some(package),
                Err(err) => {
                    roll_back(placed);
                    return Err(ErrorKind::package(err));
                },
            }
        }
        if let Err(err) = self.commit(record.clone()) {
            roll_back(placed);
            return Err(err);
        }
        tracing::info!(
            id = %record.id,
            name = %record.display_name,
            bytes = record.byte_size,
            resolution = ?record.resolution,
            "ingested asset"
        );
        Ok(record)
    }

    fn stage_file(
        &self,
        source: &Path,
        name: &str,
        file_name: &str,
        asset_type: AssetType,
    ) -> Result<(Staged, AssetRecord)> {
        let staged = self.store.stage_file(source, name).map_err(ErrorKind::storage)?;
        let byte_size = size_of(staged.path()).map_err(ErrorKind::storage)?;
        let resolution = self.probe.resolution(staged.path(), asset_type);
        let destination = staged.destination().to_path_buf();
        let record = new_record(file_name.to_string(), destination, asset_type, resolution, byte_size, None);
        Ok((staged, record))
    }

    /// Describe the staged copy rather than the source, so the record matches
    /// what the library will actually hold.
    fn stage_package(&self, source: &Path, name: &str) -> Result<(Staged, AssetRecord)> {
        // Validate before copying anything.
        PackageDescriptor::load(source).map_err(ErrorKind::package)?;
        let staged = self.store.stage_dir(source, name).map_err(ErrorKind::storage)?;
        let mut package = PackageDescriptor::load(staged.path()).map_err(ErrorKind::package)?;
        if let Err(err) = package.extract_preview() {
            tracing::warn!(package = %source.display(), error = ?err, "couldn't extract packed preview");
        }
        let byte_size = size_of(staged.path()).map_err(ErrorKind::storage)?;
        let resolution = package_resolution(&package);
        let record = new_record(
            package.name().to_string(),
            staged.destination().to_path_buf(),
            AssetType::EnginePackage,
            resolution,
            byte_size,
            None,
        );
        Ok((staged, record))
    }

    /// Remove a record and, if the catalog owns them, its files.
    ///
    /// Returns `false` (and writes nothing) when no record has this id.
    /// Deleting the files is best-effort: a file that's already gone, or
    /// can't be deleted, doesn't fail the removal.
    #[instrument(skip(self))]
    pub fn remove(&mut self, id: AssetId) -> Result<bool> {
        let Some(record) = self.get(id).cloned() else {
            return Ok(false);
        };
        let remaining: Vec<AssetRecord> = self.records.iter().filter(|r| r.id != id).cloned().collect();
        self.persist(&remaining)?;
        self.records = Arc::from(remaining);

        if record.owned {
            match self.store.remove(&record.source_path) {
                Ok(true) => {},
                Ok(false) => tracing::debug!(path = %record.source_path.display(), "asset files were already gone"),
                Err(err) => tracing::warn!(path = %record.source_path.display(), error = ?err, "couldn't delete asset files"),
            }
        }
        tracing::info!(id = %record.id, name = %record.display_name, "removed asset");
        Ok(true)
    }

    /// Register every engine package directly inside `directory` in place,
    /// without copying. Packages already cataloged at the same path are
    /// skipped, as are packages that don't decode.
    ///
    /// The records aren't owned, so removing them never deletes their files.
    #[instrument(skip(self), fields(registered))]
    pub fn register_bundled(&mut self, directory: &Path) -> Result<Vec<AssetRecord>> {
        let entries = std::fs::read_dir(directory).or_raise(|| ErrorKind::NotFound(directory.to_path_buf()))?;
        let mut candidates: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.is_dir() && is_package_directory(path))
            .filter_map(|path| path.canonicalize().ok())
            .collect();
        candidates.sort();

        let mut registered = Vec::new();
        for path in candidates {
            let known = self.records.iter().chain(&registered).any(|r: &AssetRecord| r.source_path == path);
            if known {
                continue;
            }
            let package = match PackageDescriptor::load(&path) {
                Ok(package) => package,
                Err(err) => {
                    tracing::warn!(package = %path.display(), error = ?err, "skipping bundled package");
                    continue;
                },
            };
            let byte_size = match size_of(&path) {
                Ok(size) => size,
                Err(err) => {
                    tracing::warn!(package = %path.display(), error = ?err, "skipping bundled package");
                    continue;
                },
            };
            let resolution = package_resolution(&package);
            let mut record = new_record(
                package.name().to_string(),
                path,
                AssetType::EnginePackage,
                resolution,
                byte_size,
                Some(package),
            );
            record.owned = false;
            registered.push(record);
        }

        tracing::Span::current().record("registered", registered.len());
        if registered.is_empty() {
            return Ok(registered);
        }
        let next: Vec<AssetRecord> = self.records.iter().chain(&registered).cloned().collect();
        self.persist(&next)?;
        self.records = Arc::from(next);
        Ok(registered)
    }

    /// Set an asset as the desktop background through `setter`.
    ///
    /// Returns the file that was handed over: the asset itself, or the
    /// preview for engine packages.
    #[instrument(skip(self, setter))]
    pub fn apply(&self, id: AssetId, setter: &dyn DesktopSetter, scope: DisplayScope) -> Result<PathBuf> {
        let record = self.get(id).ok_or_raise(|| ErrorKind::UnknownAsset(id))?;
        let target = record
            .apply_target()
            .ok_or_raise(|| ErrorKind::NotFound(record.source_path.clone()))?;
        if !target.is_file() {
            exn::bail!(ErrorKind::NotFound(target.to_path_buf()));
        }
        setter.set_background(target, &scope).or_raise(|| ErrorKind::Apply)?;
        tracing::info!(id = %id, target = %target.display(), %scope, "applied background");
        Ok(target.to_path_buf())
    }

    /// Append (replacing any record at the same path) and persist.
    fn commit(&mut self, record: AssetRecord) -> Result<()> {
        let mut next: Vec<AssetRecord> =
            self.records.iter().filter(|r| r.source_path != record.source_path).cloned().collect();
        if next.len() < self.records.len() {
            tracing::debug!(path = %record.source_path.display(), "replacing previous record for the same copy");
        }
        next.push(record);
        self.persist(&next)?;
        self.records = Arc::from(next);
        Ok(())
    }

    fn persist(&self, records: &[AssetRecord]) -> Result<()> {
        let bytes = snapshot::encode(records)?;
        self.store.write_atomic(SNAPSHOT_FILE, &bytes).or_raise(|| ErrorKind::Snapshot)?;
        Ok(())
    }
}

// Put back whatever a failed ingest replaced.
fn roll_back(placed: Placed) {
    let path = placed.path().to_path_buf();
    if let Err(err) = placed.restore() {
        tracing::warn!(path = %path.display(), error = ?err, "couldn't restore the previous copy");
    }
}

fn new_record(
    display_name: String,
    source_path: PathBuf,
    asset_type: AssetType,
    resolution: Option<Resolution>,
    byte_size: u64,
    package: Option<PackageDescriptor>,
) -> AssetRecord {
    AssetRecord {
        id: AssetId::new(),
        display_name,
        source_path,
        asset_type,
        created_at: OffsetDateTime::now_utc(),
        resolution,
        byte_size,
        owned: true,
        package,
    }
}

/// Projection size from the manifest, falling back to the scene file.
fn package_resolution(package: &PackageDescriptor) -> Option<Resolution> {
    if let Some(size) = package.manifest.projection_size() {
        return Some(size.into());
    }
    match package.scene() {
        Ok(scene) => scene.and_then(|scene| scene.resolution()).map(Resolution::from),
        Err(err) => {
            tracing::debug!(package = %package.directory().display(), error = ?err, "couldn't read scene");
            None
        },
    }
}

fn load_descriptor(path: &Path) -> Option<PackageDescriptor> {
    match PackageDescriptor::load(path) {
        Ok(package) => Some(package),
        Err(err) => {
            tracing::warn!(package = %path.display(), error = ?err, "keeping package record without its manifest");
            None
        },
    }
}

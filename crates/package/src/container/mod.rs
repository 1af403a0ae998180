//! Binary package container decoder.
//!
//! A container is a small header, an entry table, and raw payloads referenced
//! by absolute offset:
//!
//! ```text
//! header:  "PKGV" | version u32 | entry_count u32
//! entry:   name_len u32 | name | offset u64 | size u64 | compressed_size u64 | flag u8
//! ```
//!
//! All integers are little-endian. A non-zero flag marks the payload as a
//! single zstd frame of `compressed_size` bytes that decodes to `size` bytes.

mod entry;
mod header;
#[cfg(any(test, feature = "writer"))]
mod writer;

pub use entry::PackageEntry;
pub use header::{HEADER_LEN, Header, MAGIC, SUPPORTED_VERSION};
#[cfg(any(test, feature = "writer"))]
pub use writer::ContainerWriter;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use header::{read_u8, read_u32, read_u64};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::instrument;
use wallhub_compress::Compression;

/// Upper bound on the number of entries a container may declare.
pub const MAX_ENTRIES: u32 = 65_536;
/// Upper bound on the byte length of a single entry name.
pub const MAX_NAME_LEN: u32 = 4096;
// name_len + offset + size + compressed_size + flag, with an empty name.
const MIN_ENTRY_LEN: u64 = 4 + 8 + 8 + 8 + 1;
// Initial buffer size cap; the buffer grows as real data arrives.
const PREALLOCATE_LIMIT: u64 = 16 * 1024 * 1024;

/// An opened container with its validated entry table.
///
/// # Examples
///
/// ```no_run
/// use wallhub_package::container::Container;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut container = Container::open("/path/to/package/scene.pkg")?;
/// for entry in container.entries() {
///     println!("{} ({} bytes)", entry.name, entry.uncompressed_size);
/// }
/// let scene = container.extract_named("scene.json")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Container<R> {
    reader: R,
    length: u64,
    header: Header,
    entries: Vec<PackageEntry>,
}

impl Container<BufReader<File>> {
    /// Open a container file and decode its header and entry table.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ErrorKind::from_io(&e, path))?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: Read + Seek> Container<R> {
    /// Decode the header and entry table from any seekable reader.
    ///
    /// Every entry is bounds-checked against the reader's total length, so an
    /// entry that would read past the end is rejected here rather than at
    /// extraction time.
    #[instrument(level = "debug", skip(reader), fields(length, entries))]
    pub fn from_reader(mut reader: R) -> Result<Self> {
        let length = reader.seek(SeekFrom::End(0)).or_raise(|| ErrorKind::Io)?;
        tracing::Span::current().record("length", length);
        reader.seek(SeekFrom::Start(0)).or_raise(|| ErrorKind::Io)?;

        let header = Header::read(&mut reader)?;
        if header.entry_count > MAX_ENTRIES {
            exn::bail!(ErrorKind::malformed(format!(
                "container declares {} entries (limit {MAX_ENTRIES})",
                header.entry_count
            )));
        }
        // Reject a count the file can't possibly hold before allocating for it.
        let remaining = length.saturating_sub(HEADER_LEN);
        if u64::from(header.entry_count) * MIN_ENTRY_LEN > remaining {
            exn::bail!(ErrorKind::Truncated);
        }

        let mut entries = Vec::with_capacity(header.entry_count as usize);
        for _ in 0..header.entry_count {
            let entry = read_entry_record(&mut reader)?;
            entry.check_bounds(length)?;
            entries.push(entry);
        }
        tracing::Span::current().record("entries", entries.len());

        Ok(Self { reader, length, header, entries })
    }

    pub fn header(&self) -> Header {
        self.header
    }

    /// Total length of the container in bytes.
    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PackageEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<PackageEntry> {
        self.entries
    }

    /// Look up an entry by its exact name.
    pub fn find(&self, name: &str) -> Option<&PackageEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Read (and decompress, if needed) one entry's payload.
    pub fn extract(&mut self, entry: &PackageEntry) -> Result<Vec<u8>> {
        read_payload(&mut self.reader, self.length, entry)
    }

    /// Extract an entry by name, or `None` if the container has no such entry.
    pub fn extract_named(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        let Some(entry) = self.find(name).cloned() else {
            return Ok(None);
        };
        self.extract(&entry).map(Some)
    }
}

/// List the entries of the container at `path`.
///
/// # Errors
///
/// [`BadMagic`](ErrorKind::BadMagic) for anything that is not a container,
/// [`UnsupportedVersion`](ErrorKind::UnsupportedVersion) for a container of
/// another version, [`Truncated`](ErrorKind::Truncated) when the header or
/// entry table is cut short and [`OutOfBounds`](ErrorKind::OutOfBounds) when an
/// entry points past the end of the file.
pub fn open_directory(path: impl AsRef<Path>) -> Result<Vec<PackageEntry>> {
    Ok(Container::open(path)?.into_entries())
}

/// Extract a single entry from the container at `path`.
///
/// The entry's bounds are checked again against the file as it is now, so an
/// entry listed before the file shrank is rejected instead of read short.
pub fn extract(path: impl AsRef<Path>, entry: &PackageEntry) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| ErrorKind::from_io(&e, path))?;
    let length = file.metadata().map_err(|e| ErrorKind::from_io(&e, path))?.len();
    read_payload(&mut BufReader::new(file), length, entry)
}

fn read_entry_record<R: Read>(reader: &mut R) -> Result<PackageEntry> {
    let name_len = read_u32(reader)?;
    if name_len > MAX_NAME_LEN {
        exn::bail!(ErrorKind::malformed(format!("entry name of {name_len} bytes (limit {MAX_NAME_LEN})")));
    }
    let mut name = vec![0u8; name_len as usize];
    reader.read_exact(&mut name).map_err(|e| ErrorKind::from_read(&e))?;
    let name = String::from_utf8(name).or_raise(|| ErrorKind::malformed("entry name is not valid UTF-8"))?;

    let offset = read_u64(reader)?;
    let size = read_u64(reader)?;
    let compressed_size = read_u64(reader)?;
    let is_compressed = read_u8(reader)? != 0;

    Ok(PackageEntry {
        name,
        offset,
        stored_size: if is_compressed { compressed_size } else { size },
        uncompressed_size: size,
        is_compressed,
    })
}

#[instrument(level = "debug", skip(reader, entry), fields(entry = %entry.name, stored = entry.stored_size, compression = %entry.compression()))]
fn read_payload<R: Read + Seek>(reader: &mut R, length: u64, entry: &PackageEntry) -> Result<Vec<u8>> {
    entry.check_bounds(length)?;
    reader.seek(SeekFrom::Start(entry.offset)).or_raise(|| ErrorKind::Io)?;

    let mut stored = Vec::with_capacity(entry.stored_size.min(PREALLOCATE_LIMIT) as usize);
    reader
        .by_ref()
        .take(entry.stored_size)
        .read_to_end(&mut stored)
        .map_err(|e| ErrorKind::from_read(&e))?;
    if (stored.len() as u64) < entry.stored_size {
        exn::bail!(ErrorKind::Truncated);
    }

    let compression = entry.compression();
    if compression != Compression::None && Compression::from_magic_bytes(&stored) != compression {
        tracing::debug!(entry = %entry.name, "compressed payload has no frame header");
        exn::bail!(ErrorKind::DecompressionFailed);
    }
    compression
        .decompress_exact(&stored, entry.uncompressed_size)
        .or_raise(|| ErrorKind::DecompressionFailed)
}

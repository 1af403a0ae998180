use super::header::{HEADER_LEN, MAGIC, SUPPORTED_VERSION};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::path::Path;
use wallhub_compress::Compression;

struct PendingEntry {
    name: String,
    size: u64,
    payload: Vec<u8>,
    compressed: bool,
}

/// Builds containers in the layout [`Container`](super::Container) reads.
///
/// Payloads are laid out back to back directly after the entry table, in the
/// order they were added.
///
/// # Examples
///
/// ```
/// use wallhub_package::container::ContainerWriter;
///
/// let bytes = ContainerWriter::new()
///     .stored("project.json", br#"{"title":"Demo"}"#.to_vec())
///     .compressed("scene.json", b"{}")
///     .unwrap()
///     .to_bytes()
///     .unwrap();
/// assert!(bytes.starts_with(b"PKGV"));
/// ```
pub struct ContainerWriter {
    version: u32,
    entries: Vec<PendingEntry>,
}

impl Default for ContainerWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerWriter {
    pub fn new() -> Self {
        Self { version: SUPPORTED_VERSION, entries: Vec::new() }
    }

    /// Override the header version (useful for producing unsupported containers).
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Add an entry stored verbatim.
    pub fn stored(mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let payload = data.into();
        self.entries.push(PendingEntry {
            name: name.into(),
            size: payload.len() as u64,
            payload,
            compressed: false,
        });
        self
    }

    /// Add an entry packed as a zstd frame.
    pub fn compressed(mut self, name: impl Into<String>, data: &[u8]) -> Result<Self> {
        let payload = Compression::Zstd.compress(data).or_raise(|| ErrorKind::Io)?;
        self.entries.push(PendingEntry {
            name: name.into(),
            size: data.len() as u64,
            payload,
            compressed: true,
        });
        Ok(self)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let count = u32::try_from(self.entries.len()).or_raise(|| ErrorKind::malformed("too many entries"))?;
        let table_len: u64 = self.entries.iter().map(|e| 4 + e.name.len() as u64 + 25).sum();

        let mut out = Vec::new();
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());

        let mut offset = HEADER_LEN + table_len;
        for entry in &self.entries {
            let name_len =
                u32::try_from(entry.name.len()).or_raise(|| ErrorKind::malformed("entry name too long"))?;
            let stored = entry.payload.len() as u64;
            out.extend_from_slice(&name_len.to_le_bytes());
            out.extend_from_slice(entry.name.as_bytes());
            out.extend_from_slice(&offset.to_le_bytes());
            out.extend_from_slice(&entry.size.to_le_bytes());
            out.extend_from_slice(&(if entry.compressed { stored } else { 0 }).to_le_bytes());
            out.push(u8::from(entry.compressed));
            offset += stored;
        }
        for entry in &self.entries {
            out.extend_from_slice(&entry.payload);
        }
        Ok(out)
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_bytes()?).map_err(|e| ErrorKind::from_io(&e, path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_follow_entry_table() {
        let bytes = ContainerWriter::new().stored("a", b"xyz".to_vec()).stored("bc", b"".to_vec()).to_bytes().unwrap();
        // header + two table rows + payload
        assert_eq!(bytes.len(), 12 + (4 + 1 + 25) + (4 + 2 + 25) + 3);
        let first_offset = u64::from_le_bytes(bytes[17..25].try_into().unwrap());
        assert_eq!(first_offset, 12 + 30 + 31);
        assert_eq!(&bytes[first_offset as usize..], b"xyz");
    }

    #[test]
    fn write_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.pkg");
        ContainerWriter::new().stored("a", b"1".to_vec()).write(&path).unwrap();
        assert!(std::fs::read(&path).unwrap().starts_with(&MAGIC));
    }
}

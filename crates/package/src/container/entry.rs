use crate::error::{ErrorKind, Result};
use wallhub_compress::Compression;

/// One named payload listed in a container's entry table.
///
/// Every numeric field comes straight from the file, so nothing here is
/// trusted until [`check_bounds`](Self::check_bounds) has passed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageEntry {
    pub name: String,
    /// Absolute offset of the payload from the start of the container.
    pub offset: u64,
    /// Bytes occupied inside the container.
    pub stored_size: u64,
    /// Bytes after decompression (equal to `stored_size` when stored verbatim).
    pub uncompressed_size: u64,
    pub is_compressed: bool,
}

impl PackageEntry {
    #[inline]
    #[must_use]
    pub fn compression(&self) -> Compression {
        Compression::from_flag(self.is_compressed)
    }

    /// One past the last payload byte, or `None` if that overflows.
    #[inline]
    #[must_use]
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.stored_size)
    }

    /// Reject an entry whose payload does not lie entirely inside a
    /// container of `length` bytes.
    pub fn check_bounds(&self, length: u64) -> Result<()> {
        match self.end() {
            Some(end) if end <= length => Ok(()),
            _ => exn::bail!(ErrorKind::OutOfBounds { offset: self.offset, size: self.stored_size, length }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn entry(offset: u64, stored_size: u64) -> PackageEntry {
        PackageEntry {
            name: "scene.json".to_string(),
            offset,
            stored_size,
            uncompressed_size: stored_size,
            is_compressed: false,
        }
    }

    #[rstest]
    #[case(0, 0, 0, true)]
    #[case(12, 88, 100, true)]
    #[case(12, 89, 100, false)]
    #[case(100, 0, 100, true)]
    #[case(101, 0, 100, false)]
    #[case(u64::MAX, 1, u64::MAX, false)]
    fn bounds(#[case] offset: u64, #[case] size: u64, #[case] length: u64, #[case] ok: bool) {
        let result = entry(offset, size).check_bounds(length);
        assert_eq!(result.is_ok(), ok);
        if let Err(err) = result {
            assert_eq!(*err, ErrorKind::OutOfBounds { offset, size, length });
        }
    }

    #[test]
    fn compression_follows_flag() {
        let mut e = entry(0, 1);
        assert_eq!(e.compression(), Compression::None);
        e.is_compressed = true;
        assert_eq!(e.compression(), Compression::Zstd);
    }
}

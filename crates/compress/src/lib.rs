//! Payload codecs for engine package entries.
//!
//! Entries inside a package container are either stored verbatim or packed
//! as a single zstd frame. This crate wraps both behind the [`Compression`]
//! enum, providing:
//!
//! - **Format detection** from magic bytes ([`Compression::from_magic_bytes`])
//! - **In-memory** compression ([`Compression::compress`])
//! - **Length-checked** decompression ([`Compression::decompress_exact`]) that
//!   never buffers more than one byte past the declared size, so a lying size
//!   field cannot be used to balloon memory.
//! - **Streaming** via wrapped readers ([`Compression::wrap_reader`])

pub mod error;
mod ops;

use std::fmt::{Display, Formatter, Result as FmtResult};

const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// A supported payload encoding. Defaults to [`None`](Self::None) (stored).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Compression {
    /// Stored verbatim
    #[default]
    None,
    /// A single zstd frame, no external dictionary
    Zstd,
}

impl Compression {
    /// Map a container entry's compression flag onto a codec.
    #[inline]
    #[must_use]
    pub fn from_flag(compressed: bool) -> Self {
        match compressed {
            true => Compression::Zstd,
            false => Compression::None,
        }
    }

    /// Returns the short name (for displaying to user)
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Zstd => "zstd",
        }
    }

    /// Detect the encoding from magic bytes.
    ///
    /// Returns [`None`](Self::None) when no magic bytes match or the input is
    /// too short to tell.
    #[must_use]
    pub fn from_magic_bytes(bytes: &[u8]) -> Self {
        if bytes.starts_with(&ZSTD_MAGIC) {
            return Compression::Zstd;
        }
        Compression::None
    }
}

impl Display for Compression {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use crate::Compression;
    use rstest::rstest;

    #[test]
    fn compression_default() {
        assert_eq!(Compression::default(), Compression::None);
    }

    #[rstest]
    #[case(true, Compression::Zstd)]
    #[case(false, Compression::None)]
    fn test_from_flag(#[case] flag: bool, #[case] expected: Compression) {
        assert_eq!(Compression::from_flag(flag), expected);
    }

    #[rstest]
    #[case(b"", Compression::None)]
    #[case(b"PKGV", Compression::None)]
    #[case(&[0x28, 0xB5, 0x2F], Compression::None)]
    #[case(&[0x28, 0xB5, 0x2F, 0xFD, 0x00], Compression::Zstd)]
    fn test_from_magic_bytes(#[case] bytes: &[u8], #[case] expected: Compression) {
        assert_eq!(Compression::from_magic_bytes(bytes), expected);
    }

    #[test]
    fn test_display() {
        assert_eq!(Compression::Zstd.to_string(), "zstd");
        assert_eq!(Compression::None.to_string(), "none");
    }
}

use crate::error::{ErrorKind, Result};
use std::io::Read;

/// Magic bytes at the very start of every container.
pub const MAGIC: [u8; 4] = *b"PKGV";
/// The only container version this decoder understands.
pub const SUPPORTED_VERSION: u32 = 1;
/// Fixed header length: magic, version and entry count.
pub const HEADER_LEN: u64 = 12;

/// Decoded fixed-size container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u32,
    pub entry_count: u32,
}

impl Header {
    /// Read and validate the header from the start of a container.
    ///
    /// The magic is checked before any other field is looked at, so a
    /// non-container never produces a version or count error.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic).map_err(|e| ErrorKind::from_read(&e))?;
        if magic != MAGIC {
            exn::bail!(ErrorKind::BadMagic(magic));
        }
        let version = read_u32(reader)?;
        if version != SUPPORTED_VERSION {
            exn::bail!(ErrorKind::UnsupportedVersion(version));
        }
        let entry_count = read_u32(reader)?;
        Ok(Self { version, entry_count })
    }
}

pub(crate) fn read_u8<R: Read>(reader: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf).map_err(|e| ErrorKind::from_read(&e))?;
    Ok(buf[0])
}

pub(crate) fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf).map_err(|e| ErrorKind::from_read(&e))?;
    Ok(u32::from_le_bytes(buf))
}

pub(crate) fn read_u64<R: Read>(reader: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf).map_err(|e| ErrorKind::from_read(&e))?;
    Ok(u64::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn header_bytes(magic: &[u8; 4], version: u32, count: u32) -> Vec<u8> {
        let mut bytes = magic.to_vec();
        bytes.extend_from_slice(&version.to_le_bytes());
        bytes.extend_from_slice(&count.to_le_bytes());
        bytes
    }

    #[test]
    fn reads_valid_header() {
        let bytes = header_bytes(&MAGIC, 1, 3);
        let header = Header::read(&mut bytes.as_slice()).unwrap();
        assert_eq!(header, Header { version: 1, entry_count: 3 });
    }

    #[test]
    fn magic_checked_before_version() {
        // Garbage version, but the magic is wrong first.
        let bytes = header_bytes(b"RIFF", 99, 0);
        let err = Header::read(&mut bytes.as_slice()).unwrap_err();
        assert_eq!(*err, ErrorKind::BadMagic(*b"RIFF"));
    }

    #[test]
    fn recognised_but_unsupported_version() {
        let bytes = header_bytes(&MAGIC, 2, 0);
        let err = Header::read(&mut bytes.as_slice()).unwrap_err();
        assert_eq!(*err, ErrorKind::UnsupportedVersion(2));
    }

    #[rstest]
    #[case(0)]
    #[case(3)]
    #[case(6)]
    #[case(11)]
    fn short_header_is_truncated(#[case] len: usize) {
        let bytes = header_bytes(&MAGIC, 1, 1);
        let err = Header::read(&mut &bytes[..len]).unwrap_err();
        assert_eq!(*err, ErrorKind::Truncated);
    }
}

//! Codec Operations

use crate::Compression;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::io::{Read, Write};
use tracing::instrument;
use zstd::stream::{read::Decoder as ZstdDecoder, write::Encoder as ZstdEncoder};

// Packages are written once and read many times; favour ratio over speed.
const ZSTD_LEVEL: i32 = 19;
// Never trust a declared size for the initial allocation, the buffer grows
// as real data arrives.
const PREALLOCATE_LIMIT: usize = 16 * 1024 * 1024;

impl Compression {
    /// Compress a byte slice in memory.
    ///
    /// # Examples
    ///
    /// ```
    /// use wallhub_compress::Compression;
    ///
    /// let data = b"Hello, world!";
    /// let compressed = Compression::Zstd.compress(data).unwrap();
    /// assert_eq!(Compression::from_magic_bytes(&compressed), Compression::Zstd);
    /// ```
    pub fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.compress_into(input, &mut output)?;
        Ok(output)
    }

    #[instrument(skip(input, output), fields(format = %self, input_size = input.len(), output_size))]
    pub fn compress_into(&self, input: &[u8], output: &mut Vec<u8>) -> Result<usize> {
        let size = match self {
            Compression::None => {
                output.extend_from_slice(input);
                input.len()
            },
            Compression::Zstd => {
                let mut encoder = ZstdEncoder::new(&mut *output, ZSTD_LEVEL).or_raise(|| ErrorKind::Encoder)?;
                encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
                encoder.finish().or_raise(|| ErrorKind::Io)?;
                output.len()
            },
        };
        tracing::Span::current().record("output_size", size);
        Ok(size)
    }

    /// Decompress `input`, requiring the output to be exactly `expected` bytes.
    ///
    /// The decoder is streamed and capped at `expected + 1` bytes, so an
    /// overlong payload is detected without decoding all of it.
    ///
    /// # Examples
    ///
    /// ```
    /// use wallhub_compress::Compression;
    ///
    /// let original = b"scene data scene data scene data";
    /// let compressed = Compression::Zstd.compress(original).unwrap();
    /// let decoded = Compression::Zstd.decompress_exact(&compressed, original.len() as u64).unwrap();
    /// assert_eq!(decoded, original);
    /// assert!(Compression::Zstd.decompress_exact(&compressed, 3).is_err());
    /// ```
    #[instrument(skip(input), fields(format = %self, input_size = input.len()))]
    pub fn decompress_exact(&self, input: &[u8], expected: u64) -> Result<Vec<u8>> {
        let capacity = usize::try_from(expected).unwrap_or(usize::MAX).min(PREALLOCATE_LIMIT);
        let mut output = Vec::with_capacity(capacity);
        self.wrap_reader(input)?
            .take(expected.saturating_add(1))
            .read_to_end(&mut output)
            .or_raise(|| ErrorKind::InvalidData)?;
        // Infallible on every supported platform: usize is at most 64 bits.
        let actual = u64::try_from(output.len()).unwrap_or(u64::MAX);
        if actual != expected {
            exn::bail!(ErrorKind::LengthMismatch { expected, actual });
        }
        Ok(output)
    }

    /// Wrap a reader with the appropriate decoding layer.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io::{Cursor, Read};
    /// use wallhub_compress::Compression;
    ///
    /// let original = b"Hello, world!";
    /// let compressed = Compression::Zstd.compress(original).unwrap();
    /// let mut reader = Compression::Zstd.wrap_reader(Cursor::new(compressed)).unwrap();
    /// let mut decompressed = Vec::new();
    /// reader.read_to_end(&mut decompressed).unwrap();
    /// assert_eq!(decompressed, original);
    /// ```
    pub fn wrap_reader<'a, R: Read + 'a>(&self, reader: R) -> Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Compression::None => Box::new(reader),
            Compression::Zstd => Box::new(ZstdDecoder::new(reader).or_raise(|| ErrorKind::Encoder)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::Compression;
    use crate::error::ErrorKind;
    use rstest::rstest;
    use std::io::Read;

    const SAMPLE: &[u8] = b"Hello, world! This is a test of some package entry compression.";

    #[rstest]
    #[case(Compression::None)]
    #[case(Compression::Zstd)]
    fn test_decompress_exact(#[case] format: Compression) {
        let compressed = format.compress(SAMPLE).unwrap();
        let decompressed = format.decompress_exact(&compressed, SAMPLE.len() as u64).unwrap();
        assert_eq!(decompressed, SAMPLE);
    }

    #[rstest]
    #[case(Compression::None, 10)]
    #[case(Compression::Zstd, 10)]
    #[case(Compression::None, 1000)]
    #[case(Compression::Zstd, 1000)]
    fn test_decompress_exact_length_mismatch(#[case] format: Compression, #[case] expected: u64) {
        let compressed = format.compress(SAMPLE).unwrap();
        let err = format.decompress_exact(&compressed, expected).unwrap_err();
        assert!(matches!(*err, ErrorKind::LengthMismatch { .. }));
    }

    #[test]
    fn test_decompress_exact_stops_early() {
        // One byte past the expectation is enough to know it's wrong.
        let big = vec![7u8; 1024 * 1024];
        let compressed = Compression::Zstd.compress(&big).unwrap();
        let err = Compression::Zstd.decompress_exact(&compressed, 16).unwrap_err();
        assert_eq!(*err, ErrorKind::LengthMismatch { expected: 16, actual: 17 });
    }

    #[test]
    fn test_invalid_compressed_data() {
        let invalid = b"This is not compressed data";
        assert!(Compression::Zstd.decompress_exact(invalid, invalid.len() as u64).is_err());
    }

    #[test]
    fn test_wrap_reader_stored() {
        let mut reader = Compression::None.wrap_reader(SAMPLE).unwrap();
        let mut output = Vec::new();
        reader.read_to_end(&mut output).unwrap();
        assert_eq!(output, SAMPLE);
    }
}

//! Decompression of radar payloads.
//!
//! MRMS serves `*.grib2.gz`; other feeds use zlib or raw deflate, and some
//! mirrors serve the GRIB2 file as-is. The container is sniffed from the
//! leading bytes.

use std::fmt;
use std::io::{self, Read};

use flate2::read::{DeflateDecoder, MultiGzDecoder, ZlibDecoder};
use thiserror::Error;
use tracing::debug;

/// Default cap on decompressed output (512 MiB).
pub const DEFAULT_MAX_DECOMPRESSED_BYTES: u64 = 512 * 1024 * 1024;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const GRIB_MAGIC: &[u8; 4] = b"GRIB";

/// Compression container of a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// RFC 1952, possibly multi-member
    Gzip,
    /// RFC 1950
    Zlib,
    /// RFC 1951, no header
    Deflate,
    /// Already a GRIB2 file
    Uncompressed,
}

impl Container {
    /// Sniff the container from the leading bytes.
    pub fn detect(data: &[u8]) -> Self {
        if data.starts_with(GRIB_MAGIC) {
            Container::Uncompressed
        } else if data.starts_with(&GZIP_MAGIC) {
            Container::Gzip
        } else if is_zlib_header(data) {
            Container::Zlib
        } else {
            Container::Deflate
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Container::Gzip => "gzip",
            Container::Zlib => "zlib",
            Container::Deflate => "deflate",
            Container::Uncompressed => "uncompressed",
        })
    }
}

/// CMF/FLG pair: deflate method, window <= 32K, header checksum divisible by 31.
fn is_zlib_header(data: &[u8]) -> bool {
    match data {
        [cmf, flg, ..] => {
            cmf & 0x0F == 8 && cmf >> 4 <= 7 && u16::from_be_bytes([*cmf, *flg]) % 31 == 0
        }
        _ => false,
    }
}

/// Resource limits for [`decompress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecompressLimits {
    pub max_output_bytes: u64,
}

impl Default for DecompressLimits {
    fn default() -> Self {
        Self {
            max_output_bytes: DEFAULT_MAX_DECOMPRESSED_BYTES,
        }
    }
}

#[derive(Debug, Error)]
pub enum DecompressionError {
    #[error("Compressed payload is empty")]
    Empty,

    #[error("Corrupt {container} stream: {source}")]
    Corrupt {
        container: Container,
        #[source]
        source: io::Error,
    },

    #[error("Decompressed {container} payload exceeds the limit of {limit} bytes")]
    TooLarge { container: Container, limit: u64 },
}

/// Decompress `compressed` into the raw grid buffer.
///
/// Output is never allowed to grow past `limits.max_output_bytes`: the
/// decoder reads at most one byte more than the cap.
pub fn decompress(compressed: &[u8], limits: DecompressLimits) -> Result<Vec<u8>, DecompressionError> {
    if compressed.is_empty() {
        return Err(DecompressionError::Empty);
    }

    let container = Container::detect(compressed);
    let limit = limits.max_output_bytes;

    let output = match container {
        Container::Uncompressed => {
            if compressed.len() as u64 > limit {
                return Err(DecompressionError::TooLarge { container, limit });
            }
            compressed.to_vec()
        }
        Container::Gzip => read_capped(MultiGzDecoder::new(compressed), container, limit)?,
        Container::Zlib => read_capped(ZlibDecoder::new(compressed), container, limit)?,
        Container::Deflate => read_capped(DeflateDecoder::new(compressed), container, limit)?,
    };

    debug!(
        container = %container,
        compressed = compressed.len(),
        decompressed = output.len(),
        "Decompressed payload"
    );
    Ok(output)
}

fn read_capped<R: Read>(reader: R, container: Container, limit: u64) -> Result<Vec<u8>, DecompressionError> {
    let mut output = Vec::new();
    reader
        .take(limit.saturating_add(1))
        .read_to_end(&mut output)
        .map_err(|source| DecompressionError::Corrupt { container, source })?;

    if output.len() as u64 > limit {
        return Err(DecompressionError::TooLarge { container, limit });
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_decompress_gzip_valid() {
        let original = b"Hello, GRIB2 world!";
        let out = decompress(&gzip(original), DecompressLimits::default()).unwrap();
        assert_eq!(out, original);
    }

    #[test]
    fn test_zlib_header_detection() {
        assert!(is_zlib_header(&[0x78, 0x9C]));
        assert!(is_zlib_header(&[0x78, 0x01]));
        assert!(is_zlib_header(&[0x78, 0xDA]));
        // Right method, bad checksum
        assert!(!is_zlib_header(&[0x78, 0x00]));
        assert!(!is_zlib_header(&[0x78]));
    }

    #[test]
    fn test_detect() {
        assert_eq!(Container::detect(b"GRIB\0\0\0\x02"), Container::Uncompressed);
        assert_eq!(Container::detect(&[0x1f, 0x8b, 8, 0]), Container::Gzip);
        assert_eq!(Container::detect(&[0x78, 0x9C]), Container::Zlib);
        assert_eq!(Container::detect(&[0xED, 0xC1]), Container::Deflate);
    }

    #[test]
    fn test_exact_limit_is_allowed() {
        let data = vec![7u8; 1000];
        let limits = DecompressLimits { max_output_bytes: 1000 };
        assert_eq!(decompress(&gzip(&data), limits).unwrap().len(), 1000);

        let limits = DecompressLimits { max_output_bytes: 999 };
        assert!(matches!(
            decompress(&gzip(&data), limits).unwrap_err(),
            DecompressionError::TooLarge { limit: 999, .. }
        ));
    }
}

//! PNG encoding for RGBA image data.
//!
//! Supports two encoding modes:
//! - **Indexed PNG (color type 3)**: Used when image has ≤256 unique colors.
//!   Produces smaller files and encodes faster. Every color-table render
//!   lands here.
//! - **RGBA PNG (color type 6)**: Fallback for images with >256 colors.
//!
//! Palette order is the order in which colors first appear in the image, so
//! identical pixels always encode to identical bytes.

use std::collections::{HashMap, HashSet};
use std::io::Write;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use rayon::prelude::*;
use tracing::debug;

use crate::error::EncodingError;

/// Maximum colors for indexed PNG (PNG8)
const MAX_PALETTE_SIZE: usize = 256;

/// Minimum pixels to benefit from parallel palette extraction
const PARALLEL_THRESHOLD: usize = 4096; // 64x64 or larger

const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

type Palette = Vec<[u8; 4]>;

/// Encode RGBA pixels as a PNG, choosing indexed or truecolor output.
///
/// Runs on the calling thread.
///
/// # Arguments
/// - `pixels`: RGBA pixel data (4 bytes per pixel, row-major, top row first)
/// - `width`: Image width in pixels
/// - `height`: Image height in pixels
pub fn encode_png(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>, EncodingError> {
    check_dimensions(pixels, width, height)?;
    encode_with_palette(pixels, width, height, extract_palette_sequential(pixels))
}

/// [`encode_png`] with palette extraction spread over rayon's global pool
/// for large images. Output is byte-identical.
pub fn encode_png_parallel(
    pixels: &[u8],
    width: u32,
    height: u32,
) -> Result<Vec<u8>, EncodingError> {
    check_dimensions(pixels, width, height)?;

    let palette = if pixels.len() / 4 >= PARALLEL_THRESHOLD {
        extract_palette_parallel(pixels)
    } else {
        extract_palette_sequential(pixels)
    };
    encode_with_palette(pixels, width, height, palette)
}

fn encode_with_palette(
    pixels: &[u8],
    width: u32,
    height: u32,
    palette: Option<(Palette, Vec<u8>)>,
) -> Result<Vec<u8>, EncodingError> {
    let png = match palette {
        Some((palette, indices)) => encode_indexed(width, height, &palette, &indices)?,
        None => encode_rgba(pixels, width, height)?,
    };

    debug!(width, height, bytes = png.len(), "Encoded PNG");
    Ok(png)
}

/// Encode RGBA pixels as a truecolor PNG (color type 6) regardless of the
/// number of distinct colors.
pub fn encode_png_rgba(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>, EncodingError> {
    check_dimensions(pixels, width, height)?;
    encode_rgba(pixels, width, height)
}

/// `data:image/png;base64,...` URL embedding `png`.
pub fn png_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

fn check_dimensions(pixels: &[u8], width: u32, height: u32) -> Result<(), EncodingError> {
    if width == 0 || height == 0 {
        return Err(EncodingError::EmptyImage { width, height });
    }
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4));
    if expected != Some(pixels.len()) {
        return Err(EncodingError::BufferSizeMismatch {
            width,
            height,
            expected: expected.unwrap_or(usize::MAX),
            actual: pixels.len(),
        });
    }
    Ok(())
}

/// Pack RGBA bytes into a u32 for faster hashing and comparison
#[inline(always)]
fn pack_color(p: &[u8]) -> u32 {
    u32::from_le_bytes([p[0], p[1], p[2], p[3]])
}

/// Sequential palette extraction for small images.
fn extract_palette_sequential(pixels: &[u8]) -> Option<(Palette, Vec<u8>)> {
    let mut color_to_index: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette: Palette = Vec::with_capacity(MAX_PALETTE_SIZE);
    let mut indices: Vec<u8> = Vec::with_capacity(pixels.len() / 4);

    for chunk in pixels.chunks_exact(4) {
        let packed = pack_color(chunk);

        let index = match color_to_index.get(&packed) {
            Some(&idx) => idx,
            None => {
                if palette.len() >= MAX_PALETTE_SIZE {
                    return None;
                }
                let idx = palette.len() as u8;
                palette.push([chunk[0], chunk[1], chunk[2], chunk[3]]);
                color_to_index.insert(packed, idx);
                idx
            }
        };
        indices.push(index);
    }

    Some((palette, indices))
}

/// Parallel palette extraction for larger images.
///
/// Strategy:
/// 1. Parallel pass: each chunk lists its colors in first-occurrence order
/// 2. Merge the lists in chunk order and check if ≤256
/// 3. Parallel pass: map each pixel to its palette index
///
/// Merging in chunk order gives the same palette as the sequential scan.
fn extract_palette_parallel(pixels: &[u8]) -> Option<(Palette, Vec<u8>)> {
    let chunk_pixels = (pixels.len() / 4 / rayon::current_num_threads()).max(256);
    let chunk_size = chunk_pixels * 4;

    let local_palettes: Vec<Vec<u32>> = pixels
        .par_chunks(chunk_size)
        .map(|chunk| {
            let mut seen: HashSet<u32> = HashSet::with_capacity(MAX_PALETTE_SIZE);
            let mut ordered = Vec::with_capacity(MAX_PALETTE_SIZE);
            for pixel in chunk.chunks_exact(4) {
                let packed = pack_color(pixel);
                if seen.insert(packed) {
                    ordered.push(packed);
                    // Early exit if we definitely have too many colors
                    if ordered.len() > MAX_PALETTE_SIZE {
                        break;
                    }
                }
            }
            ordered
        })
        .collect();

    let mut color_to_index: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette: Palette = Vec::with_capacity(MAX_PALETTE_SIZE);
    for packed in local_palettes.into_iter().flatten() {
        if !color_to_index.contains_key(&packed) {
            if palette.len() >= MAX_PALETTE_SIZE {
                return None; // Too many colors
            }
            color_to_index.insert(packed, palette.len() as u8);
            palette.push(packed.to_le_bytes());
        }
    }

    let mut indices = vec![0u8; pixels.len() / 4];
    indices
        .par_chunks_mut(chunk_pixels)
        .zip(pixels.par_chunks(chunk_size))
        .for_each(|(idx_chunk, px_chunk)| {
            for (idx, pixel) in idx_chunk.iter_mut().zip(px_chunk.chunks_exact(4)) {
                // Every color was registered in the merge above
                *idx = color_to_index.get(&pack_color(pixel)).copied().unwrap_or(0);
            }
        });

    Some((palette, indices))
}

/// Create an indexed PNG (color type 3) from palette and indices.
fn encode_indexed(
    width: u32,
    height: u32,
    palette: &[[u8; 4]],
    indices: &[u8],
) -> Result<Vec<u8>, EncodingError> {
    let mut png = Vec::new();
    png.extend_from_slice(&PNG_SIGNATURE);
    write_chunk(&mut png, b"IHDR", &ihdr(width, height, 3));

    let plte: Vec<u8> = palette.iter().flat_map(|c| [c[0], c[1], c[2]]).collect();
    write_chunk(&mut png, b"PLTE", &plte);

    // tRNS chunk (transparency) - only if any color has alpha < 255
    if palette.iter().any(|c| c[3] < 255) {
        let trns: Vec<u8> = palette.iter().map(|c| c[3]).collect();
        write_chunk(&mut png, b"tRNS", &trns);
    }

    let idat = deflate_scanlines(indices, width as usize)?;
    write_chunk(&mut png, b"IDAT", &idat);
    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

/// Create a PNG image from RGBA pixel data (color type 6).
fn encode_rgba(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>, EncodingError> {
    let mut png = Vec::new();
    png.extend_from_slice(&PNG_SIGNATURE);
    write_chunk(&mut png, b"IHDR", &ihdr(width, height, 6));

    let idat = deflate_scanlines(pixels, width as usize * 4)?;
    write_chunk(&mut png, b"IDAT", &idat);
    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

fn ihdr(width: u32, height: u32, color_type: u8) -> [u8; 13] {
    let mut data = [0u8; 13];
    data[0..4].copy_from_slice(&width.to_be_bytes());
    data[4..8].copy_from_slice(&height.to_be_bytes());
    data[8] = 8; // bit depth
    data[9] = color_type;
    // compression, filter and interlace methods stay 0
    data
}

/// Prefix every scanline with filter type 0 and zlib-compress the result.
fn deflate_scanlines(data: &[u8], row_bytes: usize) -> Result<Vec<u8>, EncodingError> {
    let rows = data.len() / row_bytes;
    let mut uncompressed = Vec::with_capacity(rows * (1 + row_bytes));
    for row in data.chunks_exact(row_bytes) {
        uncompressed.push(0); // filter type: none
        uncompressed.extend_from_slice(row);
    }

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(&uncompressed)?;
    Ok(encoder.finish()?)
}

/// Write a PNG chunk
fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_palette_first_occurrence_order() {
        let pixels = [
            0, 0, 255, 255, // blue
            255, 0, 0, 255, // red
            0, 0, 255, 255, // blue again
            0, 0, 0, 0, // transparent
        ];

        let (palette, indices) = extract_palette_sequential(&pixels).unwrap();
        assert_eq!(palette, vec![[0, 0, 255, 255], [255, 0, 0, 255], [0, 0, 0, 0]]);
        assert_eq!(indices, vec![0, 1, 0, 2]);
    }

    #[test]
    fn test_extract_palette_too_many_colors() {
        let pixels: Vec<u8> = (0..300u32).flat_map(|i| [i as u8, (i >> 8) as u8, 0, 255]).collect();
        assert!(extract_palette_sequential(&pixels).is_none());
        assert!(extract_palette_parallel(&pixels).is_none());
    }

    #[test]
    fn test_parallel_palette_matches_sequential() {
        // 128x128 = 16384 pixels, above PARALLEL_THRESHOLD
        let mut pixels = Vec::with_capacity(128 * 128 * 4);
        for y in 0..128u32 {
            for x in 0..128u32 {
                let c = (((x / 8) + (y / 8)) % 50) as u8;
                pixels.extend_from_slice(&[c * 5, 100 + c * 3, 200 - c * 2, 255]);
            }
        }

        assert_eq!(
            extract_palette_parallel(&pixels),
            extract_palette_sequential(&pixels)
        );
    }

    #[test]
    fn test_parallel_encoding_is_byte_identical() {
        let pixels: Vec<u8> = (0..100 * 80u32)
            .flat_map(|i| [(i % 7) as u8 * 30, 0, 255, if i % 5 == 0 { 0 } else { 255 }])
            .collect();
        assert_eq!(
            encode_png_parallel(&pixels, 100, 80).unwrap(),
            encode_png(&pixels, 100, 80).unwrap()
        );
    }

    #[test]
    fn test_chunk_crc() {
        let mut out = Vec::new();
        write_chunk(&mut out, b"IEND", &[]);
        // Well-known CRC of an empty IEND chunk
        assert_eq!(out, [0, 0, 0, 0, b'I', b'E', b'N', b'D', 0xAE, 0x42, 0x60, 0x82]);
    }

    #[test]
    fn test_data_url_prefix() {
        let url = png_data_url(&PNG_SIGNATURE);
        assert_eq!(url, "data:image/png;base64,iVBORw0KGgo=");
    }
}

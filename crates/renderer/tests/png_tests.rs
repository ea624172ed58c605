//! Tests for PNG encoding functionality.
//!
//! Every encoded image is decoded again with the `image` crate to prove the
//! output is a valid, lossless PNG.

use renderer::{encode_png, encode_png_rgba, png_data_url, EncodingError};

// ============================================================================
// Helper functions
// ============================================================================

fn decode_rgba(png: &[u8]) -> (u32, u32, Vec<u8>) {
    let img = image::load_from_memory_with_format(png, image::ImageFormat::Png)
        .expect("valid PNG")
        .to_rgba8();
    (img.width(), img.height(), img.into_raw())
}

/// Color type byte from the IHDR chunk
fn color_type(png: &[u8]) -> u8 {
    png[25]
}

fn has_chunk(png: &[u8], name: &[u8; 4]) -> bool {
    png.windows(4).any(|w| w == name)
}

/// Radar-like pixels: a handful of palette colors plus transparency
fn radar_pixels(width: usize, height: usize) -> Vec<u8> {
    let colors: [[u8; 4]; 5] = [
        [0, 0, 0, 0],
        [0, 255, 0, 255],
        [255, 255, 0, 255],
        [255, 0, 0, 255],
        [128, 0, 128, 255],
    ];
    let mut pixels = Vec::with_capacity(width * height * 4);
    for y in 0..height {
        for x in 0..width {
            pixels.extend_from_slice(&colors[(x / 7 + y / 5) % colors.len()]);
        }
    }
    pixels
}

// ============================================================================
// Format selection
// ============================================================================

#[test]
fn test_indexed_round_trip() {
    let pixels = radar_pixels(40, 30);
    let png = encode_png(&pixels, 40, 30).unwrap();

    assert_eq!(&png[..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
    assert_eq!(color_type(&png), 3);
    assert!(has_chunk(&png, b"PLTE"));
    assert!(has_chunk(&png, b"tRNS"));
    assert_eq!(decode_rgba(&png), (40, 30, pixels));
}

#[test]
fn test_opaque_indexed_has_no_trns() {
    let pixels = [255u8, 0, 0, 255, 0, 0, 255, 255];
    let png = encode_png(&pixels, 2, 1).unwrap();
    assert_eq!(color_type(&png), 3);
    assert!(!has_chunk(&png, b"tRNS"));
}

#[test]
fn test_rgba_fallback_many_colors() {
    // 32x32 = 1024 distinct colors
    let pixels: Vec<u8> = (0..1024u32)
        .flat_map(|i| [(i & 0xFF) as u8, (i >> 8) as u8, 7, 200])
        .collect();
    let png = encode_png(&pixels, 32, 32).unwrap();

    assert_eq!(color_type(&png), 6);
    assert_eq!(decode_rgba(&png), (32, 32, pixels));
}

#[test]
fn test_forced_rgba() {
    let pixels = radar_pixels(8, 8);
    let png = encode_png_rgba(&pixels, 8, 8).unwrap();
    assert_eq!(color_type(&png), 6);
    assert_eq!(decode_rgba(&png).2, pixels);
}

#[test]
fn test_large_image_parallel_extraction() {
    // 256x256 takes the parallel palette path
    let pixels = radar_pixels(256, 256);
    let png = encode_png(&pixels, 256, 256).unwrap();
    assert_eq!(color_type(&png), 3);
    assert_eq!(decode_rgba(&png).2, pixels);
}

// ============================================================================
// Determinism and edge cases
// ============================================================================

#[test]
fn test_encoding_is_deterministic() {
    let pixels = radar_pixels(300, 200);
    let a = encode_png(&pixels, 300, 200).unwrap();
    let b = encode_png(&pixels, 300, 200).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_single_pixel() {
    let png = encode_png(&[1, 2, 3, 4], 1, 1).unwrap();
    assert_eq!(decode_rgba(&png), (1, 1, vec![1, 2, 3, 4]));
}

#[test]
fn test_all_transparent() {
    let pixels = vec![0u8; 16 * 16 * 4];
    let png = encode_png(&pixels, 16, 16).unwrap();
    assert_eq!(decode_rgba(&png).2, pixels);
}

#[test]
fn test_size_mismatch() {
    let err = encode_png(&[0u8; 15], 2, 2).unwrap_err();
    assert!(matches!(
        err,
        EncodingError::BufferSizeMismatch { expected: 16, actual: 15, .. }
    ));
}

#[test]
fn test_zero_dimensions() {
    assert!(matches!(
        encode_png(&[], 0, 5).unwrap_err(),
        EncodingError::EmptyImage { width: 0, height: 5 }
    ));
    assert!(matches!(
        encode_png_rgba(&[], 5, 0).unwrap_err(),
        EncodingError::EmptyImage { .. }
    ));
}

#[test]
fn test_data_url_decodes_to_png() {
    use base64::Engine;

    let png = encode_png(&radar_pixels(4, 4), 4, 4).unwrap();
    let url = png_data_url(&png);
    let payload = url.strip_prefix("data:image/png;base64,").unwrap();
    let decoded = base64::engine::general_purpose::STANDARD.decode(payload).unwrap();
    assert_eq!(decoded, png);
}

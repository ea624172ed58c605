//! PNG packing (data representation template 5.41).
//!
//! Section 7 holds a complete PNG stream. Each pixel is one packed integer:
//! grayscale for depths up to 16 bits, RGB for 24 and RGBA for 32, with the
//! channels concatenated big-endian.

use image::{DynamicImage, ImageFormat};

use crate::Grib2Error;

/// Decode the packed integers stored in a template 5.41 PNG stream.
pub fn decode_png_values(
    data: &[u8],
    expected: usize,
    bits_per_value: u8,
) -> Result<Vec<u32>, Grib2Error> {
    let image = image::load_from_memory_with_format(data, ImageFormat::Png)
        .map_err(|e| Grib2Error::UnpackingError(format!("embedded PNG: {}", e)))?;

    let values: Vec<u32> = match image {
        DynamicImage::ImageLuma8(buf) => {
            // Sub-byte gray depths come back scaled to the 0..=255 range
            let divisor = if (1..8).contains(&bits_per_value) {
                255 / ((1u32 << bits_per_value) - 1)
            } else {
                1
            };
            buf.into_raw().into_iter().map(|v| v as u32 / divisor).collect()
        }
        DynamicImage::ImageLuma16(buf) => buf.into_raw().into_iter().map(u32::from).collect(),
        DynamicImage::ImageRgb8(buf) => buf
            .into_raw()
            .chunks_exact(3)
            .map(|p| u32::from_be_bytes([0, p[0], p[1], p[2]]))
            .collect(),
        DynamicImage::ImageRgba8(buf) => buf
            .into_raw()
            .chunks_exact(4)
            .map(|p| u32::from_be_bytes([p[0], p[1], p[2], p[3]]))
            .collect(),
        other => {
            return Err(Grib2Error::UnpackingError(format!(
                "unsupported PNG color type {:?} for {}-bit values",
                other.color(),
                bits_per_value
            )))
        }
    };

    if values.len() != expected {
        return Err(Grib2Error::InvalidSection {
            section: 7,
            reason: format!("PNG holds {} values, section 5 declares {}", values.len(), expected),
        });
    }

    Ok(values)
}

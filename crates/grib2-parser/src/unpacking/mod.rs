//! GRIB2 data unpacking algorithms.
//!
//! Implements:
//! - Simple packing (template 5.0, used by GFS and many NCEP products)
//! - PNG packing (template 5.41, used by MRMS)
//!
//! Both schemes store unsigned integers `X` that expand to physical values
//! with the same formula:
//!
//! `value = (R + X * 2^E) * 10^(-D)`

mod png;

use tracing::debug;

use crate::sections::{DataRepresentation, PackingMethod};
use crate::Grib2Error;

pub use self::png::decode_png_values;

/// Unpack a data section into one value per grid point.
///
/// Grid points masked out by `bitmap` (bit = 0) receive `no_data`. Without a
/// bitmap, the number of packed values must equal `num_grid_points`.
pub fn unpack(
    repr: &DataRepresentation,
    data: &[u8],
    bitmap: Option<&[u8]>,
    num_grid_points: usize,
    no_data: f32,
) -> Result<Vec<f32>, Grib2Error> {
    let num_packed = repr.num_data_points as usize;

    match bitmap {
        Some(bm) => {
            let present = count_present(bm, num_grid_points)?;
            if present != num_packed {
                return Err(Grib2Error::InvalidSection {
                    section: 6,
                    reason: format!(
                        "bitmap marks {} points present but section 5 packs {}",
                        present, num_packed
                    ),
                });
            }
        }
        None if num_packed != num_grid_points => {
            return Err(Grib2Error::InvalidSection {
                section: 5,
                reason: format!(
                    "{} packed values for {} grid points without a bitmap",
                    num_packed, num_grid_points
                ),
            });
        }
        None => {}
    }

    let raw = match repr.packing {
        _ if repr.bits_per_value == 0 => vec![0u32; num_packed],
        PackingMethod::Simple => unpack_bits(data, num_packed, repr.bits_per_value)?,
        PackingMethod::Png => decode_png_values(data, num_packed, repr.bits_per_value)?,
    };

    debug!(
        packing = ?repr.packing,
        bits_per_value = repr.bits_per_value,
        packed = num_packed,
        grid_points = num_grid_points,
        "Unpacked GRIB2 data section"
    );

    let scale = Scaling::from(repr);
    let mut values = Vec::with_capacity(num_grid_points);
    match bitmap {
        None => values.extend(raw.iter().map(|&x| scale.apply(x))),
        Some(bm) => {
            let mut packed = raw.iter();
            for i in 0..num_grid_points {
                if bit_is_set(bm, i) {
                    // count_present guaranteed one packed value per set bit
                    values.push(packed.next().map_or(no_data, |&x| scale.apply(x)));
                } else {
                    values.push(no_data);
                }
            }
        }
    }

    Ok(values)
}

/// Extract `count` big-endian bit fields of width `bits_per_value`.
///
/// Fails if the data is too short to hold every field; the buffer is never
/// partially read.
pub fn unpack_bits(data: &[u8], count: usize, bits_per_value: u8) -> Result<Vec<u32>, Grib2Error> {
    if bits_per_value > 32 {
        return Err(Grib2Error::UnpackingError(format!(
            "Invalid number of bits: {}",
            bits_per_value
        )));
    }

    let needed = (count * bits_per_value as usize).div_ceil(8);
    if data.len() < needed {
        return Err(Grib2Error::DataTooShort {
            needed,
            available: data.len(),
        });
    }

    let mut reader = BitReader::new(data);
    Ok((0..count).map(|_| reader.read(bits_per_value)).collect())
}

/// Scale parameters from section 5.
#[derive(Debug, Clone, Copy)]
struct Scaling {
    reference: f64,
    binary: f64,
    decimal: f64,
}

impl From<&DataRepresentation> for Scaling {
    fn from(repr: &DataRepresentation) -> Self {
        Self {
            reference: repr.reference_value as f64,
            binary: 2f64.powi(repr.binary_scale_factor as i32),
            decimal: 10f64.powi(-(repr.decimal_scale_factor as i32)),
        }
    }
}

impl Scaling {
    #[inline]
    fn apply(&self, packed: u32) -> f32 {
        ((self.reference + packed as f64 * self.binary) * self.decimal) as f32
    }
}

/// MSB-first reader over a packed bit stream.
struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    /// Read `num_bits` (at most 32). Callers check the length up front.
    fn read(&mut self, num_bits: u8) -> u32 {
        let mut value: u64 = 0;
        let mut remaining = num_bits as usize;

        while remaining > 0 {
            let byte = self.data[self.bit_pos / 8];
            let available = 8 - self.bit_pos % 8;
            let take = available.min(remaining);
            let bits = (byte >> (available - take)) & (((1u16 << take) - 1) as u8);

            value = (value << take) | bits as u64;
            self.bit_pos += take;
            remaining -= take;
        }

        value as u32
    }
}

#[inline]
fn bit_is_set(bitmap: &[u8], index: usize) -> bool {
    (bitmap[index / 8] >> (7 - index % 8)) & 1 == 1
}

/// Number of set bits among the first `num_grid_points` bitmap bits.
fn count_present(bitmap: &[u8], num_grid_points: usize) -> Result<usize, Grib2Error> {
    let needed = num_grid_points.div_ceil(8);
    if bitmap.len() < needed {
        return Err(Grib2Error::InvalidSection {
            section: 6,
            reason: format!("bitmap has {} bytes, {} grid points need {}", bitmap.len(), num_grid_points, needed),
        });
    }

    let full_bytes = num_grid_points / 8;
    let mut count: usize = bitmap[..full_bytes].iter().map(|b| b.count_ones() as usize).sum();
    for i in full_bytes * 8..num_grid_points {
        if bit_is_set(bitmap, i) {
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repr(num_points: u32, bits: u8, reference: f32, e: i16, d: i16) -> DataRepresentation {
        DataRepresentation {
            num_data_points: num_points,
            template: 0,
            packing: PackingMethod::Simple,
            reference_value: reference,
            binary_scale_factor: e,
            decimal_scale_factor: d,
            bits_per_value: bits,
            original_data_type: 0,
        }
    }

    #[test]
    fn test_unpack_bits_byte_aligned() {
        let values = unpack_bits(&[0b1011_0101], 1, 8).unwrap();
        assert_eq!(values, vec![0b1011_0101]);
    }

    #[test]
    fn test_unpack_bits_unaligned() {
        // 0b10_11_01_01 read as four 2-bit fields
        let values = unpack_bits(&[0b1011_0101], 4, 2).unwrap();
        assert_eq!(values, vec![0b10, 0b11, 0b01, 0b01]);

        // 12-bit fields spanning byte boundaries: 0xABC, 0xDEF
        let values = unpack_bits(&[0xAB, 0xCD, 0xEF], 2, 12).unwrap();
        assert_eq!(values, vec![0xABC, 0xDEF]);
    }

    #[test]
    fn test_unpack_bits_rejects_short_data() {
        // three 16-bit values need 6 bytes
        let err = unpack_bits(&[0; 5], 3, 16).unwrap_err();
        assert!(matches!(err, Grib2Error::DataTooShort { needed: 6, available: 5 }));
    }

    #[test]
    fn test_simple_unpacking() {
        let values = unpack(&repr(2, 8, 0.0, 0, 0), &[100, 200], None, 2, -999.0).unwrap();
        assert_eq!(values, vec![100.0, 200.0]);
    }

    #[test]
    fn test_scaling_formula() {
        // value = (R + X * 2^E) * 10^-D = (-10 + X * 2) / 10
        let values = unpack(&repr(2, 8, -10.0, 1, 1), &[5, 60], None, 2, -999.0).unwrap();
        assert!((values[0] - 0.0).abs() < 1e-6);
        assert!((values[1] - 11.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_bits_is_constant_field() {
        let values = unpack(&repr(3, 0, 42.5, 0, 0), &[], None, 3, -999.0).unwrap();
        assert_eq!(values, vec![42.5; 3]);
    }

    #[test]
    fn test_bitmap_masks_missing_points() {
        // points 0 and 2 present, 1 and 3 missing
        let bitmap = [0b1010_0000];
        let values = unpack(&repr(2, 8, 0.0, 0, 0), &[7, 9], Some(&bitmap), 4, -999.0).unwrap();
        assert_eq!(values, vec![7.0, -999.0, 9.0, -999.0]);
    }

    #[test]
    fn test_bitmap_count_mismatch() {
        let bitmap = [0b1110_0000];
        let err = unpack(&repr(2, 8, 0.0, 0, 0), &[7, 9], Some(&bitmap), 4, -999.0).unwrap_err();
        assert!(matches!(err, Grib2Error::InvalidSection { section: 6, .. }));
    }

    #[test]
    fn test_missing_bitmap_requires_full_grid() {
        let err = unpack(&repr(3, 8, 0.0, 0, 0), &[1, 2, 3], None, 4, -999.0).unwrap_err();
        assert!(matches!(err, Grib2Error::InvalidSection { section: 5, .. }));
    }
}

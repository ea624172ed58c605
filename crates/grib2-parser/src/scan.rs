//! Reordering of decoded samples into canonical north-up order.

use radar_common::ScanMode;

use crate::Grib2Error;

/// Reorder samples from their native GRIB2 scan order into row-major,
/// north-up, west-to-east order.
///
/// - `+j` scans (first row southernmost) have their row order reversed.
/// - `-i` scans (rows run east to west) have each row reversed.
///
/// Column-major (`j` consecutive) and boustrophedon scans are rejected.
/// Samples already in canonical order are returned untouched.
pub fn orient_north_up(
    mut samples: Vec<f32>,
    width: usize,
    height: usize,
    scan: ScanMode,
) -> Result<Vec<f32>, Grib2Error> {
    if scan.j_consecutive || scan.alternating_rows {
        return Err(Grib2Error::UnsupportedScanMode(scan.to_grib2_flag()));
    }
    debug_assert_eq!(samples.len(), width * height);

    if scan.i_negative {
        for row in samples.chunks_exact_mut(width) {
            row.reverse();
        }
    }

    if scan.j_positive {
        for top in 0..height / 2 {
            let bottom = height - 1 - top;
            let (upper, lower) = samples.split_at_mut(bottom * width);
            upper[top * width..(top + 1) * width].swap_with_slice(&mut lower[..width]);
        }
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 3x2 grid in native order
    fn native() -> Vec<f32> {
        vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
    }

    #[test]
    fn test_north_up_is_identity() {
        let out = orient_north_up(native(), 3, 2, ScanMode::north_up()).unwrap();
        assert_eq!(out, native());
    }

    #[test]
    fn test_south_to_north_flips_rows() {
        let out = orient_north_up(native(), 3, 2, ScanMode::from_grib2_flag(0x40)).unwrap();
        assert_eq!(out, vec![4.0, 5.0, 6.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_east_to_west_flips_columns() {
        let out = orient_north_up(native(), 3, 2, ScanMode::from_grib2_flag(0x80)).unwrap();
        assert_eq!(out, vec![3.0, 2.0, 1.0, 6.0, 5.0, 4.0]);
    }

    #[test]
    fn test_both_flips() {
        let out = orient_north_up(native(), 3, 2, ScanMode::from_grib2_flag(0xC0)).unwrap();
        assert_eq!(out, vec![6.0, 5.0, 4.0, 3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_odd_height_keeps_middle_row() {
        let samples = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let out = orient_north_up(samples, 2, 3, ScanMode::from_grib2_flag(0x40)).unwrap();
        assert_eq!(out, vec![5.0, 6.0, 3.0, 4.0, 1.0, 2.0]);
    }

    #[test]
    fn test_column_major_rejected() {
        let err = orient_north_up(native(), 3, 2, ScanMode::from_grib2_flag(0x20)).unwrap_err();
        assert!(matches!(err, Grib2Error::UnsupportedScanMode(0x20)));
    }
}

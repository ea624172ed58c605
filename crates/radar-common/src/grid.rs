//! Decoded scalar grids and their scan-order description.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{GridError, GridResult};
use crate::GeoBounds;

/// Descriptive metadata carried alongside a decoded grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridMetadata {
    /// Reference (analysis) time of the product
    pub reference_time: Option<DateTime<Utc>>,
    /// Originating center (7 = NCEP, 161 = NSSL)
    pub center: u16,
    pub discipline: u8,
    pub parameter_category: u8,
    pub parameter_number: u8,
    /// Short parameter name, e.g. "REFL"
    pub parameter: String,
    /// Human readable level, e.g. "500 m above MSL"
    pub level: String,
    /// Longitude spacing between grid points, degrees
    pub dx: f64,
    /// Latitude spacing between grid points, degrees
    pub dy: f64,
}

/// A dense 2D field of scalar samples.
///
/// Samples are row-major, row 0 first. Once a grid is built through
/// [`Grid::new`], `samples.len() == width * height` always holds, so consumers
/// can index without further checks.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    width: u32,
    height: u32,
    samples: Vec<f32>,
    no_data: f32,
    bounds: GeoBounds,
    metadata: GridMetadata,
}

impl Grid {
    /// Build a grid, rejecting zero dimensions and sample-count mismatches.
    pub fn new(
        width: u32,
        height: u32,
        samples: Vec<f32>,
        no_data: f32,
        bounds: GeoBounds,
    ) -> GridResult<Self> {
        let expected = cell_count(width, height)?;
        if samples.len() != expected {
            return Err(GridError::SampleCountMismatch {
                width,
                height,
                expected,
                actual: samples.len(),
            });
        }

        Ok(Self {
            width,
            height,
            samples,
            no_data,
            bounds,
            metadata: GridMetadata::default(),
        })
    }

    /// Attach product metadata.
    pub fn with_metadata(mut self, metadata: GridMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false for a constructed grid; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// The no-data sentinel. Samples at or below it carry no measurement.
    pub fn no_data(&self) -> f32 {
        self.no_data
    }

    /// Grid-point (cell centre) bounds.
    pub fn bounds(&self) -> GeoBounds {
        self.bounds
    }

    pub fn metadata(&self) -> &GridMetadata {
        &self.metadata
    }

    /// Whether a sample value counts as missing for this grid.
    #[inline]
    pub fn is_no_data(&self, value: f32) -> bool {
        value.is_nan() || value <= self.no_data
    }

    /// Sample at column `col` of row `row`.
    pub fn get(&self, col: u32, row: u32) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        let idx = row as usize * self.width as usize + col as usize;
        self.samples.get(idx).copied()
    }

    /// Iterate over rows, northernmost first once the grid is north-up.
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.samples.chunks_exact(self.width as usize)
    }

    /// Bounds of the pixel edges rather than the cell centres.
    ///
    /// Widens [`Grid::bounds`] by half a grid spacing on every side. Falls back
    /// to the point bounds when the spacing is unknown.
    pub fn image_bounds(&self) -> GeoBounds {
        let dx = self.metadata.dx.abs();
        let dy = self.metadata.dy.abs();
        if dx == 0.0 && dy == 0.0 {
            return self.bounds;
        }
        self.bounds.expand(dy / 2.0, dx / 2.0)
    }

    /// Minimum and maximum over samples that carry data.
    pub fn value_range(&self) -> Option<(f32, f32)> {
        self.samples
            .iter()
            .copied()
            .filter(|v| !self.is_no_data(*v))
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Number of cells that carry data.
    pub fn valid_count(&self) -> usize {
        self.samples.iter().filter(|v| !self.is_no_data(**v)).count()
    }

    /// Consume the grid, returning its samples.
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

/// Number of cells in a `width x height` grid, checked for zero and overflow.
pub fn cell_count(width: u32, height: u32) -> GridResult<usize> {
    if width == 0 || height == 0 {
        return Err(GridError::EmptyDimensions { width, height });
    }
    (width as usize)
        .checked_mul(height as usize)
        .ok_or(GridError::DimensionOverflow { width, height })
}

/// Scan mode flags for grid data ordering.
///
/// Based on GRIB2 scanning mode (Flag Table 3.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScanMode {
    /// Points in a row run east to west
    pub i_negative: bool,
    /// Rows run south to north
    pub j_positive: bool,
    /// Adjacent points are in the j direction (column-major)
    pub j_consecutive: bool,
    /// Row scan direction alternates
    pub alternating_rows: bool,
}

impl ScanMode {
    /// Data starts at the north-west corner, rows west to east, north to south.
    pub fn north_up() -> Self {
        Self::default()
    }

    /// Create from GRIB2 flag byte.
    pub fn from_grib2_flag(flag: u8) -> Self {
        Self {
            i_negative: (flag & 0x80) != 0,
            j_positive: (flag & 0x40) != 0,
            j_consecutive: (flag & 0x20) != 0,
            alternating_rows: (flag & 0x10) != 0,
        }
    }

    /// GRIB2 flag byte for this mode.
    pub fn to_grib2_flag(self) -> u8 {
        let mut flag = 0;
        if self.i_negative {
            flag |= 0x80;
        }
        if self.j_positive {
            flag |= 0x40;
        }
        if self.j_consecutive {
            flag |= 0x20;
        }
        if self.alternating_rows {
            flag |= 0x10;
        }
        flag
    }

    /// True when samples are already row-major, north-up, west-to-east.
    pub fn is_north_up(&self) -> bool {
        *self == Self::north_up()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> GeoBounds {
        GeoBounds::new(37.5, -123.0, 38.0, -122.0)
    }

    #[test]
    fn test_grid_rejects_mismatched_samples() {
        let err = Grid::new(2, 2, vec![1.0, 2.0, 3.0], -999.0, bounds()).unwrap_err();
        assert_eq!(
            err,
            GridError::SampleCountMismatch {
                width: 2,
                height: 2,
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn test_grid_rejects_zero_dimensions() {
        assert!(matches!(
            Grid::new(0, 5, vec![], -999.0, bounds()),
            Err(GridError::EmptyDimensions { .. })
        ));
    }

    #[test]
    fn test_no_data_at_or_below_sentinel() {
        let grid = Grid::new(2, 2, vec![-999.0, -1000.0, -99.0, f32::NAN], -999.0, bounds()).unwrap();
        assert!(grid.is_no_data(-999.0));
        assert!(grid.is_no_data(-1000.0));
        assert!(!grid.is_no_data(-99.0));
        assert!(grid.is_no_data(f32::NAN));
        assert_eq!(grid.valid_count(), 1);
        assert_eq!(grid.value_range(), Some((-99.0, -99.0)));
    }

    #[test]
    fn test_get_and_rows() {
        let grid = Grid::new(3, 2, vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0], -999.0, bounds()).unwrap();
        assert_eq!(grid.get(2, 1), Some(12.0));
        assert_eq!(grid.get(3, 0), None);
        let rows: Vec<&[f32]> = grid.rows().collect();
        assert_eq!(rows, vec![&[0.0, 1.0, 2.0][..], &[10.0, 11.0, 12.0][..]]);
    }

    #[test]
    fn test_image_bounds_half_cell() {
        let grid = Grid::new(2, 2, vec![0.0; 4], -999.0, bounds()).unwrap().with_metadata(GridMetadata {
            dx: 1.0,
            dy: 0.5,
            ..Default::default()
        });
        let b = grid.image_bounds();
        assert_eq!(b.south, 37.25);
        assert_eq!(b.north, 38.25);
        assert_eq!(b.west, -123.5);
        assert_eq!(b.east, -121.5);
    }

    #[test]
    fn test_scan_mode_flags_round_trip() {
        for flag in [0x00u8, 0x40, 0x80, 0xC0, 0x20, 0x10] {
            assert_eq!(ScanMode::from_grib2_flag(flag).to_grib2_flag(), flag);
        }
        assert!(ScanMode::from_grib2_flag(0).is_north_up());
        assert!(!ScanMode::from_grib2_flag(0x40).is_north_up());
    }
}

//! Test data generators for reflectivity-like grids.
//!
//! Values are deterministic so tests can assert exact pixels.

/// Creates a single storm cell: about 60 dBZ at the center falling off by
/// 4 dBZ per cell of distance, with the MRMS "no coverage" value (-99)
/// outside the echo.
pub fn create_storm_grid(width: usize, height: usize) -> Vec<f32> {
    let cx = (width as f32 - 1.0) / 2.0;
    let cy = (height as f32 - 1.0) / 2.0;
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let dist = ((col as f32 - cx).powi(2) + (row as f32 - cy).powi(2)).sqrt();
            let dbz = (60.0 - dist * 4.0).round();
            data.push(if dbz < 0.0 { -99.0 } else { dbz });
        }
    }
    data
}

/// Creates a grid cycling through whole dBZ values from `-10` to `75`,
/// offset by `seed` so that distinct seeds give distinct grids.
pub fn create_reflectivity_ramp(width: usize, height: usize, seed: usize) -> Vec<f32> {
    (0..width * height)
        .map(|i| ((i + seed * 7) % 86) as f32 - 10.0)
        .collect()
}

/// Creates a grid of whole dBZ values cycling through `lower..upper`.
///
/// Grids built from disjoint bands never share a sample value.
pub fn create_reflectivity_band(width: usize, height: usize, lower: i32, upper: i32) -> Vec<f32> {
    let span = (upper - lower).max(1) as usize;
    (0..width * height)
        .map(|i| (lower + (i % span) as i32) as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storm_grid_peak_in_center() {
        let grid = create_storm_grid(5, 5);
        assert_eq!(grid[12], 60.0);
        assert!(grid[0] < 60.0);
    }

    #[test]
    fn test_ramp_range() {
        let grid = create_reflectivity_ramp(100, 1, 0);
        assert_eq!(grid[0], -10.0);
        assert!(grid.iter().all(|v| (-10.0..=75.0).contains(v)));
    }

    #[test]
    fn test_band_stays_in_range() {
        let grid = create_reflectivity_band(7, 3, 20, 30);
        assert_eq!(grid[0], 20.0);
        assert_eq!(grid[9], 29.0);
        assert_eq!(grid[10], 20.0);
        assert!(grid.iter().all(|v| (20.0..30.0).contains(v)));
    }
}

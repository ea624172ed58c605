//! Grid-to-pixel rasterization.
//!
//! One pixel per grid cell, no resampling. Pixel `i` takes the color of
//! sample `i`, so the buffer has the grid's row order (north-up).

use radar_common::Grid;
use rayon::prelude::*;
use tracing::debug;

use crate::color_table::{ColorTable, Rgba};

/// Row-major RGBA pixels, 4 bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Color at `(col, row)`, or `None` outside the image.
    pub fn pixel(&self, col: u32, row: u32) -> Option<Rgba> {
        if col >= self.width || row >= self.height {
            return None;
        }
        let i = (row as usize * self.width as usize + col as usize) * 4;
        let p = &self.data[i..i + 4];
        Some(Rgba::new(p[0], p[1], p[2], p[3]))
    }
}

/// Color every cell of `grid` on the calling thread.
pub fn rasterize(grid: &Grid, table: &ColorTable) -> PixelBuffer {
    let mut data = vec![0u8; grid.len() * 4];
    color_row(grid, table, grid.samples(), &mut data);

    debug!(width = grid.width(), height = grid.height(), "Rasterized grid");
    PixelBuffer {
        width: grid.width(),
        height: grid.height(),
        data,
    }
}

/// [`rasterize`] with rows colored on rayon's global pool. Output is
/// identical.
pub fn rasterize_parallel(grid: &Grid, table: &ColorTable) -> PixelBuffer {
    let row_bytes = grid.width() as usize * 4;
    let mut data = vec![0u8; grid.len() * 4];

    data.par_chunks_mut(row_bytes)
        .zip(grid.samples().par_chunks(grid.width() as usize))
        .for_each(|(out, row)| color_row(grid, table, row, out));

    debug!(width = grid.width(), height = grid.height(), "Rasterized grid in parallel");
    PixelBuffer {
        width: grid.width(),
        height: grid.height(),
        data,
    }
}

#[inline]
fn color_row(grid: &Grid, table: &ColorTable, samples: &[f32], out: &mut [u8]) {
    for (&sample, pixel) in samples.iter().zip(out.chunks_exact_mut(4)) {
        let color = if grid.is_no_data(sample) {
            Rgba::TRANSPARENT
        } else {
            table.color_for(sample as f64)
        };
        pixel.copy_from_slice(&color.to_array());
    }
}

//! Image rendering for radar grids.
//!
//! - [`color_table`]: threshold color tables (sample to RGBA)
//! - [`raster`]: grid to RGBA pixel buffer
//! - [`png`]: lossless PNG encoding and data-URL embedding

pub mod color_table;
pub mod error;
pub mod png;
pub mod raster;

pub use color_table::{ColorRule, ColorTable, LegendEntry, Rgba};
pub use error::{ColorTableError, EncodingError};
pub use png::{encode_png, encode_png_parallel, encode_png_rgba, png_data_url};
pub use raster::{rasterize, rasterize_parallel, PixelBuffer};

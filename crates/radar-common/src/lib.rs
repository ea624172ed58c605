//! Common types shared across the radar raster crates.

pub mod bounds;
pub mod error;
pub mod grid;

pub use bounds::{normalize_longitude, GeoBounds};
pub use error::{GridError, GridResult};
pub use grid::{cell_count, Grid, GridMetadata, ScanMode};

//! Error types for grid construction.

use thiserror::Error;

/// Result type alias using GridError.
pub type GridResult<T> = Result<T, GridError>;

/// Violations of the [`Grid`](crate::Grid) construction invariants.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("Grid dimensions must be non-zero, got {width}x{height}")]
    EmptyDimensions { width: u32, height: u32 },

    #[error("Grid dimensions {width}x{height} overflow the addressable cell count")]
    DimensionOverflow { width: u32, height: u32 },

    #[error("Sample count {actual} does not match {width}x{height} = {expected}")]
    SampleCountMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

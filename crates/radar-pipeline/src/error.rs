//! Error taxonomy of the render pipeline.

use grib2_parser::Grib2Error;
use renderer::{ColorTableError, EncodingError};
use thiserror::Error;

use crate::decompress::DecompressionError;

/// Result type alias using RadarError.
pub type RadarResult<T> = Result<T, RadarError>;

/// Errors returned by [`crate::render`]. Each variant wraps the failing
/// stage; no partial result is ever produced.
#[derive(Debug, Error)]
pub enum RadarError {
    #[error("Decompression failed: {0}")]
    Decompression(#[from] DecompressionError),

    #[error("Invalid radar grid: {0}")]
    Format(#[from] Grib2Error),

    #[error("Image encoding failed: {0}")]
    Encoding(#[from] EncodingError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<ColorTableError> for RadarError {
    fn from(e: ColorTableError) -> Self {
        RadarError::Config(e.to_string())
    }
}

impl RadarError {
    /// HTTP status an endpoint should answer with.
    ///
    /// Bad payloads are the upstream's fault (422); encoding and
    /// configuration failures are ours (500).
    pub fn http_status(&self) -> u16 {
        match self {
            RadarError::Decompression(_) | RadarError::Format(_) => 422,
            RadarError::Encoding(_) | RadarError::Config(_) => 500,
        }
    }

    /// Short machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            RadarError::Decompression(_) => "decompression",
            RadarError::Format(_) => "format",
            RadarError::Encoding(_) => "encoding",
            RadarError::Config(_) => "config",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status() {
        assert_eq!(RadarError::from(DecompressionError::Empty).http_status(), 422);
        assert_eq!(RadarError::from(Grib2Error::NoMessages).http_status(), 422);
        assert_eq!(
            RadarError::from(EncodingError::EmptyImage { width: 0, height: 1 }).http_status(),
            500
        );
        assert_eq!(RadarError::Config("bad".into()).http_status(), 500);
    }

    #[test]
    fn test_color_table_error_is_config() {
        let err = RadarError::from(ColorTableError::MissingDefault);
        assert_eq!(err.kind(), "config");
        assert!(err.to_string().starts_with("Configuration error"));
    }
}

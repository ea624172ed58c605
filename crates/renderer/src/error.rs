use thiserror::Error;

/// Errors raised while encoding a pixel buffer.
#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("Image dimensions must be non-zero, got {width}x{height}")]
    EmptyImage { width: u32, height: u32 },

    #[error("Pixel buffer has {actual} bytes, {width}x{height} RGBA needs {expected}")]
    BufferSizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("IDAT compression failed: {0}")]
    Compression(#[from] std::io::Error),
}

/// Errors raised while loading a color table.
#[derive(Debug, Error)]
pub enum ColorTableError {
    #[error("Failed to read color table: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON color table: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid YAML color table: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid rule {index}: {reason}")]
    InvalidRule { index: usize, reason: String },

    #[error("Color table has no terminal color: set 'default' or leave 'below' off the last rule")]
    MissingDefault,
}

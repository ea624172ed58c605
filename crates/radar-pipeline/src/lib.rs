//! MRMS radar render pipeline.
//!
//! Turns a compressed radar payload (typically
//! `MRMS_ReflectivityAtLowestAltitude.latest.grib2.gz`) into a PNG overlay
//! and the geographic bounds to place it at:
//!
//! ```text
//! payload -> decompress -> GRIB2 decode -> rasterize -> PNG
//! ```
//!
//! Rendering is synchronous, single-threaded unless
//! [`PipelineConfig::parallel`] is set, and does no I/O. A [`Pipeline`]
//! holds only immutable configuration and can be shared across threads.

pub mod config;
pub mod decompress;
pub mod error;

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use radar_common::{GeoBounds, Grid, GridMetadata};
use renderer::{
    encode_png, encode_png_parallel, png_data_url, rasterize, rasterize_parallel, ColorTable,
    LegendEntry,
};
use serde::{Serialize, Serializer};
use tracing::{debug, error, info, warn};

pub use config::PipelineConfig;
pub use decompress::{decompress, Container, DecompressLimits, DecompressionError};
pub use error::{RadarError, RadarResult};

/// Bytes of a rejected buffer included in error logs.
const HEADER_DUMP_LEN: usize = 16;

/// An encoded overlay plus where it goes on the map.
#[derive(Debug, Clone)]
pub struct RenderResult {
    /// PNG bytes
    pub image: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Outer edges of the image (cell edges, not cell centres)
    pub bounds: GeoBounds,
    pub metadata: GridMetadata,
    /// Legend of the color table the image was drawn with
    pub legend: Vec<LegendEntry>,
}

impl RenderResult {
    /// `data:image/png;base64,...` form of the image.
    pub fn data_url(&self) -> String {
        png_data_url(&self.image)
    }
}

/// Wire shape answered to the map: `{ image_url, bounds, width, height }`.
#[derive(Serialize)]
struct RenderResponse {
    image_url: String,
    bounds: [[f64; 2]; 2],
    width: u32,
    height: u32,
}

impl Serialize for RenderResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RenderResponse {
            image_url: self.data_url(),
            bounds: self.bounds.corners(),
            width: self.width,
            height: self.height,
        }
        .serialize(serializer)
    }
}

/// Configured decode-and-render pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    table: Arc<ColorTable>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl Pipeline {
    /// Pipeline drawing with the built-in reflectivity table. The config's
    /// `color_table` path is not read; use [`Pipeline::from_config`] for that.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            table: Arc::new(ColorTable::reflectivity()),
        }
    }

    /// Validate `config` and load its color table.
    pub fn from_config(config: PipelineConfig) -> RadarResult<Self> {
        config.validate()?;
        let table = config.load_color_table()?;
        Ok(Self {
            config,
            table: Arc::new(table),
        })
    }

    pub fn with_color_table(mut self, table: impl Into<Arc<ColorTable>>) -> Self {
        self.table = table.into();
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn color_table(&self) -> &ColorTable {
        &self.table
    }

    /// Decompress and decode `payload` into a north-up grid.
    pub fn decode(&self, payload: &[u8]) -> RadarResult<Grid> {
        let raw = decompress(payload, self.config.decompress_limits()).map_err(|e| {
            warn!(
                error = %e,
                bytes = payload.len(),
                header = %hex_prefix(payload),
                "Rejected compressed payload"
            );
            e
        })?;

        let raw = Bytes::from(raw);
        self.config.grid_decoder().decode(raw.clone()).map_err(|e| {
            error!(
                error = %e,
                bytes = raw.len(),
                header = %hex_prefix(&raw),
                "Rejected radar grid"
            );
            RadarError::from(e)
        })
    }

    /// Render `payload` with `table`, or the pipeline's own table when
    /// `None`.
    pub fn render(&self, payload: &[u8], table: Option<&ColorTable>) -> RadarResult<RenderResult> {
        let started = Instant::now();
        let table = table.unwrap_or(self.table.as_ref());

        let grid = self.decode(payload)?;
        let image = if self.config.parallel {
            let pixels = rasterize_parallel(&grid, table);
            encode_png_parallel(pixels.as_bytes(), pixels.width(), pixels.height())?
        } else {
            let pixels = rasterize(&grid, table);
            encode_png(pixels.as_bytes(), pixels.width(), pixels.height())?
        };

        let bounds = grid.image_bounds();
        debug!(
            south = bounds.south,
            west = bounds.west,
            north = bounds.north,
            east = bounds.east,
            "Overlay bounds"
        );
        info!(
            width = grid.width(),
            height = grid.height(),
            png_bytes = image.len(),
            table = table.name(),
            parallel = self.config.parallel,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Rendered radar overlay"
        );

        Ok(RenderResult {
            image,
            width: grid.width(),
            height: grid.height(),
            bounds,
            metadata: grid.metadata().clone(),
            legend: table.legend(),
        })
    }
}

/// Render `payload` with default limits and `table` (the built-in
/// reflectivity table when `None`).
pub fn render(payload: &[u8], table: Option<&ColorTable>) -> RadarResult<RenderResult> {
    Pipeline::default().render(payload, table)
}

/// Space-separated hex of the first bytes of `data`.
fn hex_prefix(data: &[u8]) -> String {
    data.iter()
        .take(HEADER_DUMP_LEN)
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_prefix() {
        assert_eq!(hex_prefix(b"GRIB"), "47 52 49 42");
        assert_eq!(hex_prefix(&[0u8; 40]).split(' ').count(), HEADER_DUMP_LEN);
        assert_eq!(hex_prefix(&[]), "");
    }

    #[test]
    fn test_pipeline_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Pipeline>();
        assert_send_sync::<RenderResult>();
    }
}

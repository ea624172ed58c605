//! Pipeline configuration.
//!
//! Loaded from YAML or JSON; every field is optional:
//!
//! ```yaml
//! max_decompressed_bytes: 536870912
//! max_grid_cells: 67108864
//! no_data: -999.0
//! color_table: config/reflectivity.yaml
//! parallel: false
//! ```

use std::path::{Path, PathBuf};

use grib2_parser::{GridDecoder, DEFAULT_MAX_CELLS, DEFAULT_NO_DATA};
use renderer::ColorTable;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::decompress::{DecompressLimits, DEFAULT_MAX_DECOMPRESSED_BYTES};
use crate::error::{RadarError, RadarResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Cap on the decompressed payload size
    pub max_decompressed_bytes: u64,
    /// Cap on `width * height` of the decoded grid
    pub max_grid_cells: usize,
    /// Sentinel for cells without data
    pub no_data: f32,
    /// Color table file; the built-in reflectivity table when unset
    pub color_table: Option<PathBuf>,
    /// Rasterize rows and extract the PNG palette on rayon's global pool.
    /// Off by default: a render then runs entirely on the calling thread.
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_decompressed_bytes: DEFAULT_MAX_DECOMPRESSED_BYTES,
            max_grid_cells: DEFAULT_MAX_CELLS,
            no_data: DEFAULT_NO_DATA,
            color_table: None,
            parallel: false,
        }
    }
}

impl PipelineConfig {
    pub fn from_yaml(yaml: &str) -> RadarResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| RadarError::Config(format!("invalid YAML config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> RadarResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| RadarError::Config(format!("invalid JSON config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from disk; `.json` files are parsed as JSON, everything else as
    /// YAML. A relative `color_table` path is resolved against the config
    /// file's directory.
    pub fn from_file(path: impl AsRef<Path>) -> RadarResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| RadarError::Config(format!("cannot read {}: {}", path.display(), e)))?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let mut config = if is_json {
            Self::from_json(&content)?
        } else {
            Self::from_yaml(&content)?
        };

        if let (Some(table), Some(dir)) = (&config.color_table, path.parent()) {
            if table.is_relative() {
                config.color_table = Some(dir.join(table));
            }
        }

        info!(path = %path.display(), "Loaded pipeline config");
        Ok(config)
    }

    pub fn validate(&self) -> RadarResult<()> {
        if self.max_decompressed_bytes == 0 {
            return Err(RadarError::Config("max_decompressed_bytes must be positive".into()));
        }
        if self.max_grid_cells == 0 {
            return Err(RadarError::Config("max_grid_cells must be positive".into()));
        }
        if !self.no_data.is_finite() {
            return Err(RadarError::Config("no_data must be a finite number".into()));
        }
        Ok(())
    }

    /// The configured color table, or the default reflectivity table.
    pub fn load_color_table(&self) -> RadarResult<ColorTable> {
        match &self.color_table {
            Some(path) => {
                let table = ColorTable::from_file(path).map_err(|e| {
                    RadarError::Config(format!("color table {}: {}", path.display(), e))
                })?;
                info!(path = %path.display(), name = table.name(), rules = table.rules().len(), "Loaded color table");
                Ok(table)
            }
            None => Ok(ColorTable::reflectivity()),
        }
    }

    pub fn decompress_limits(&self) -> DecompressLimits {
        DecompressLimits {
            max_output_bytes: self.max_decompressed_bytes,
        }
    }

    pub fn grid_decoder(&self) -> GridDecoder {
        GridDecoder {
            no_data: self.no_data,
            max_cells: self.max_grid_cells,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_decompressed_bytes, 512 * 1024 * 1024);
        assert_eq!(config.no_data, -999.0);
        assert!(config.color_table.is_none());
        assert!(!config.parallel);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = PipelineConfig::from_yaml("max_grid_cells: 1000\n").unwrap();
        assert_eq!(config.max_grid_cells, 1000);
        assert_eq!(config.max_decompressed_bytes, DEFAULT_MAX_DECOMPRESSED_BYTES);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = PipelineConfig::from_json(r#"{"max_cells": 5}"#).unwrap_err();
        assert!(matches!(err, RadarError::Config(_)));
    }

    #[test]
    fn test_zero_limits_rejected() {
        assert!(PipelineConfig::from_yaml("max_decompressed_bytes: 0").is_err());
        assert!(PipelineConfig::from_yaml("max_grid_cells: 0").is_err());
    }
}

//! Threshold color tables for radar rendering.
//!
//! A table is an ordered list of `(upper bound, color)` rules plus a terminal
//! color. A sample takes the color of the first rule whose exclusive upper
//! bound it is below; rules are evaluated in the order given and never
//! sorted, so overlapping or unsorted tables behave exactly as written.
//!
//! Tables load from JSON or YAML:
//!
//! ```json
//! {
//!   "name": "reflectivity",
//!   "units": "dBZ",
//!   "rules": [
//!     { "below": 0, "color": "#00000000", "label": "no echo" },
//!     { "below": 5, "color": "#E6E6FF" }
//!   ],
//!   "default": "#FF1493"
//! }
//! ```

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ColorTableError;

/// An 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Parse `#RRGGBB` (opaque) or `#RRGGBBAA`. The `#` is optional.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if !hex.is_ascii() || (hex.len() != 6 && hex.len() != 8) {
            return None;
        }

        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        let a = if hex.len() == 8 { channel(6)? } else { 255 };
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?, a))
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02X}", self.a)?;
        }
        Ok(())
    }
}

impl Serialize for Rgba {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rgba {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Rgba::from_hex(&hex)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid color '{}'", hex)))
    }
}

/// One threshold: samples strictly below `upper` take `color`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorRule {
    pub upper: f64,
    pub color: Rgba,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ColorRule {
    pub fn new(upper: f64, color: Rgba) -> Self {
        Self {
            upper,
            color,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// One row of a rendered legend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    /// Inclusive lower bound; `None` for the first row
    pub lower: Option<f64>,
    /// Exclusive upper bound; `None` for the terminal row
    pub upper: Option<f64>,
    pub color: Rgba,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Ordered threshold rules plus a terminal color.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorTable {
    name: String,
    units: Option<String>,
    rules: Vec<ColorRule>,
    default: Rgba,
}

/// On-disk representation.
#[derive(Debug, Deserialize)]
struct ColorTableFile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    units: Option<String>,
    #[serde(default)]
    rules: Vec<RuleEntry>,
    #[serde(default)]
    default: Option<Rgba>,
}

#[derive(Debug, Deserialize)]
struct RuleEntry {
    #[serde(default)]
    below: Option<f64>,
    color: Rgba,
    #[serde(default)]
    label: Option<String>,
}

impl ColorTable {
    pub fn new(name: impl Into<String>, rules: Vec<ColorRule>, default: Rgba) -> Self {
        Self {
            name: name.into(),
            units: None,
            rules,
            default,
        }
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    /// NWS-style base reflectivity table in dBZ.
    ///
    /// Negative values (including the MRMS "no coverage" value of -99) are
    /// transparent.
    pub fn reflectivity() -> Self {
        let rules = vec![
            ColorRule::new(0.0, Rgba::TRANSPARENT).with_label("no echo"),
            ColorRule::new(5.0, Rgba::opaque(230, 230, 255)),
            ColorRule::new(10.0, Rgba::opaque(0, 0, 255)),
            ColorRule::new(20.0, Rgba::opaque(0, 128, 255)),
            ColorRule::new(30.0, Rgba::opaque(0, 255, 0)),
            ColorRule::new(40.0, Rgba::opaque(255, 255, 0)),
            ColorRule::new(50.0, Rgba::opaque(255, 165, 0)),
            ColorRule::new(60.0, Rgba::opaque(255, 0, 0)),
            ColorRule::new(70.0, Rgba::opaque(128, 0, 128)),
        ];
        Self::new("reflectivity", rules, Rgba::opaque(255, 20, 147)).with_units("dBZ")
    }

    /// Load a color table from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ColorTableError> {
        let file: ColorTableFile = serde_json::from_str(json)?;
        Self::from_file_repr(file)
    }

    /// Load a color table from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ColorTableError> {
        let file: ColorTableFile = serde_yaml::from_str(yaml)?;
        Self::from_file_repr(file)
    }

    /// Load a color table from disk; `.json` files are parsed as JSON,
    /// everything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ColorTableError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
    }

    fn from_file_repr(file: ColorTableFile) -> Result<Self, ColorTableError> {
        let mut entries = file.rules;

        // A trailing rule without a bound is the terminal color
        let trailing = match entries.last() {
            Some(last) if last.below.is_none() => entries.pop(),
            _ => None,
        };
        let default = match (trailing, file.default) {
            (Some(_), Some(_)) => {
                return Err(ColorTableError::InvalidRule {
                    index: entries.len(),
                    reason: "unbounded rule conflicts with 'default'".to_string(),
                })
            }
            (Some(rule), None) => rule.color,
            (None, Some(color)) => color,
            (None, None) => return Err(ColorTableError::MissingDefault),
        };

        let rules = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| match entry.below {
                None => Err(ColorTableError::InvalidRule {
                    index,
                    reason: "only the last rule may omit 'below'".to_string(),
                }),
                Some(upper) if upper.is_nan() => Err(ColorTableError::InvalidRule {
                    index,
                    reason: "'below' is NaN".to_string(),
                }),
                Some(upper) => Ok(ColorRule {
                    upper,
                    color: entry.color,
                    label: entry.label,
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: file.name.unwrap_or_else(|| "custom".to_string()),
            units: file.units,
            rules,
            default,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn units(&self) -> Option<&str> {
        self.units.as_deref()
    }

    pub fn rules(&self) -> &[ColorRule] {
        &self.rules
    }

    /// Color used when no rule matches.
    pub fn default_color(&self) -> Rgba {
        self.default
    }

    /// Color for a sample: the first rule with `sample < upper`, else the
    /// terminal color. NaN is transparent.
    #[inline]
    pub fn color_for(&self, sample: f64) -> Rgba {
        if sample.is_nan() {
            return Rgba::TRANSPARENT;
        }
        self.rules
            .iter()
            .find(|rule| sample < rule.upper)
            .map_or(self.default, |rule| rule.color)
    }

    /// Legend rows in table order, terminal color last.
    pub fn legend(&self) -> Vec<LegendEntry> {
        let mut lower = None;
        let mut entries = Vec::with_capacity(self.rules.len() + 1);
        for rule in &self.rules {
            entries.push(LegendEntry {
                lower,
                upper: Some(rule.upper),
                color: rule.color,
                label: rule.label.clone(),
            });
            lower = Some(rule.upper);
        }
        entries.push(LegendEntry {
            lower,
            upper: None,
            color: self.default,
            label: None,
        });
        entries
    }
}

impl Default for ColorTable {
    fn default() -> Self {
        Self::reflectivity()
    }
}

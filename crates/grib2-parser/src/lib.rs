//! GRIB2 parser implementation (WMO FM 92 GRIB Edition 2).
//!
//! Decodes the subset of GRIB2 used by gridded radar products such as the
//! MRMS mosaics: regular lat/lon grids (template 3.0), simple or PNG packing
//! (templates 5.0 and 5.41) and optional bitmaps.
//!
//! The usual entry point is [`decode_grid`], which turns the first message of
//! a raw (already decompressed) buffer into a north-up [`Grid`].

pub mod scan;
pub mod sections;
pub mod tables;
pub mod unpacking;

use bytes::Bytes;
use radar_common::{cell_count, GeoBounds, Grid, GridError, GridMetadata};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::sections::{
    Bitmap, DataRepresentation, DataSection, GridDefinition, Identification, Indicator,
    ProductDefinition, END_MARKER, INDICATOR_LEN,
};

/// Sentinel written into cells without a measurement (MRMS "missing").
pub const DEFAULT_NO_DATA: f32 = -999.0;

/// Default cap on decoded grid cells (64 Mi cells, 256 MiB of f32 samples).
pub const DEFAULT_MAX_CELLS: usize = 64 * 1024 * 1024;

/// Errors raised while decoding a GRIB2 buffer.
#[derive(Debug, Error)]
pub enum Grib2Error {
    #[error("Buffer too short: need {needed} bytes, got {available}")]
    TooShort { needed: usize, available: usize },

    #[error("Invalid GRIB magic bytes {0:02x?}")]
    InvalidMagic([u8; 4]),

    #[error("Expected GRIB edition 2, got {0}")]
    UnsupportedEdition(u8),

    #[error("Message declares {declared} bytes but only {available} are available")]
    Truncated { declared: u64, available: usize },

    #[error("Invalid section {section}: {reason}")]
    InvalidSection { section: u8, reason: String },

    #[error("Required section {0} is missing")]
    MissingSection(u8),

    #[error("Unsupported template {section}.{template}")]
    UnsupportedTemplate { section: u8, template: u16 },

    #[error("Unsupported scanning mode flags 0x{0:02x}")]
    UnsupportedScanMode(u8),

    #[error("Data section too short: need {needed} bytes, got {available}")]
    DataTooShort { needed: usize, available: usize },

    #[error("Grid of {cells} cells exceeds the limit of {limit}")]
    GridTooLarge { cells: usize, limit: usize },

    #[error("Failed to unpack data: {0}")]
    UnpackingError(String),

    #[error("Buffer contains no GRIB2 messages")]
    NoMessages,

    #[error(transparent)]
    InvalidGrid(#[from] GridError),
}

/// One decoded GRIB2 message (a single field).
#[derive(Debug, Clone)]
pub struct Grib2Message {
    pub indicator: Indicator,
    pub identification: Identification,
    pub grid_definition: GridDefinition,
    pub product_definition: ProductDefinition,
    pub data_representation: DataRepresentation,
    pub bitmap: Option<Bitmap>,
    pub data_section: DataSection,
}

impl Grib2Message {
    /// Parse a single message. `message` must span exactly one message,
    /// indicator through `7777`.
    pub fn parse(message: Bytes) -> Result<Self, Grib2Error> {
        let indicator = sections::parse_indicator(&message)?;
        let end = message.len() - END_MARKER.len();
        if &message[end..] != END_MARKER {
            return Err(Grib2Error::InvalidSection {
                section: 8,
                reason: "missing 7777 end marker".to_string(),
            });
        }

        let mut identification = None;
        let mut grid_definition = None;
        let mut product_definition = None;
        let mut data_representation = None;
        let mut bitmap = None;
        let mut data_section = None;

        let mut offset = INDICATOR_LEN;
        while offset < end {
            if offset + 5 > end {
                return Err(Grib2Error::InvalidSection {
                    section: 0,
                    reason: format!("dangling {} bytes before end marker", end - offset),
                });
            }
            let length = sections::read_u32(&message, offset) as usize;
            let number = message[offset + 4];
            if length < 5 || offset + length > end {
                return Err(Grib2Error::InvalidSection {
                    section: number,
                    reason: format!("length {} at offset {} overruns the message", length, offset),
                });
            }
            let section = message.slice(offset..offset + length);

            match number {
                1 => identification = Some(sections::parse_identification(&section)?),
                2 => debug!(length, "Skipping local use section"),
                3 => grid_definition = Some(sections::parse_grid_definition(&section)?),
                4 => {
                    product_definition = Some(sections::parse_product_definition(
                        &section,
                        indicator.discipline,
                    )?)
                }
                5 => data_representation = Some(sections::parse_data_representation(&section)?),
                6 => bitmap = sections::parse_bitmap(section)?,
                7 => data_section = Some(sections::parse_data_section(section)?),
                other => {
                    return Err(Grib2Error::InvalidSection {
                        section: other,
                        reason: "unknown section number".to_string(),
                    })
                }
            }

            offset += length;

            // Later fields of a multi-field message repeat sections 2-7; only
            // the first field is decoded.
            if number == 7 {
                if offset < end {
                    debug!(remaining = end - offset, "Ignoring additional fields in message");
                }
                break;
            }
        }

        Ok(Self {
            identification: identification.ok_or(Grib2Error::MissingSection(1))?,
            grid_definition: grid_definition.ok_or(Grib2Error::MissingSection(3))?,
            product_definition: product_definition.ok_or(Grib2Error::MissingSection(4))?,
            data_representation: data_representation.ok_or(Grib2Error::MissingSection(5))?,
            data_section: data_section.ok_or(Grib2Error::MissingSection(7))?,
            bitmap,
            indicator,
        })
    }

    /// Grid width (points along a parallel).
    pub fn width(&self) -> u32 {
        self.grid_definition.ni
    }

    /// Grid height (points along a meridian).
    pub fn height(&self) -> u32 {
        self.grid_definition.nj
    }

    /// Unpack the data section in native scan order.
    pub fn unpack_data(&self, no_data: f32) -> Result<Vec<f32>, Grib2Error> {
        let num_points = cell_count(self.width(), self.height())?;
        unpacking::unpack(
            &self.data_representation,
            &self.data_section.data,
            self.bitmap.as_ref().map(|b| &b.data[..]),
            num_points,
            no_data,
        )
    }

    /// Geographic bounds of the grid points.
    pub fn bounds(&self) -> GeoBounds {
        let gd = &self.grid_definition;
        GeoBounds::from_corners(
            gd.first_latitude,
            gd.first_longitude,
            gd.last_latitude,
            gd.last_longitude,
            gd.scan_mode.i_negative,
        )
    }

    pub fn metadata(&self) -> GridMetadata {
        GridMetadata {
            reference_time: self.identification.reference_time,
            center: self.identification.center,
            discipline: self.indicator.discipline,
            parameter_category: self.product_definition.parameter_category,
            parameter_number: self.product_definition.parameter_number,
            parameter: self.product_definition.parameter_short_name.clone(),
            level: self.product_definition.level_description.clone(),
            dx: self.grid_definition.longitude_step(),
            dy: self.grid_definition.latitude_step(),
        }
    }

    /// Decode into a north-up [`Grid`].
    pub fn to_grid(&self, no_data: f32) -> Result<Grid, Grib2Error> {
        let (width, height) = (self.width(), self.height());
        let native = self.unpack_data(no_data)?;
        let samples = scan::orient_north_up(
            native,
            width as usize,
            height as usize,
            self.grid_definition.scan_mode,
        )?;

        Ok(Grid::new(width, height, samples, no_data, self.bounds())?.with_metadata(self.metadata()))
    }
}

/// Sequential reader over the messages of a GRIB2 buffer.
pub struct Grib2Reader {
    data: Bytes,
    offset: usize,
}

impl Grib2Reader {
    pub fn new(data: Bytes) -> Self {
        Self { data, offset: 0 }
    }

    /// Parse the next message, or `None` at end of input.
    ///
    /// Trailing bytes that do not start a new message (zero padding, for
    /// instance) end the iteration.
    pub fn next_message(&mut self) -> Result<Option<Grib2Message>, Grib2Error> {
        let remaining = &self.data[self.offset..];
        if remaining.is_empty() {
            return Ok(None);
        }
        if self.offset > 0 && !remaining.starts_with(b"GRIB") {
            warn!(trailing = remaining.len(), "Ignoring trailing bytes after last GRIB2 message");
            self.offset = self.data.len();
            return Ok(None);
        }

        let indicator = sections::parse_indicator(remaining)?;
        let declared = indicator.message_length;
        let min_length = (INDICATOR_LEN + END_MARKER.len()) as u64;
        if declared < min_length {
            return Err(Grib2Error::InvalidSection {
                section: 0,
                reason: format!("message length {} is below the minimum {}", declared, min_length),
            });
        }
        if declared > remaining.len() as u64 {
            return Err(Grib2Error::Truncated {
                declared,
                available: remaining.len(),
            });
        }

        let length = declared as usize;
        let message = Grib2Message::parse(self.data.slice(self.offset..self.offset + length))?;
        self.offset += length;
        Ok(Some(message))
    }
}

/// Configurable GRIB2-to-[`Grid`] decoder.
#[derive(Debug, Clone, Copy)]
pub struct GridDecoder {
    /// Value written into cells without data
    pub no_data: f32,
    /// Largest `width * height` accepted before allocating samples
    pub max_cells: usize,
}

impl Default for GridDecoder {
    fn default() -> Self {
        Self {
            no_data: DEFAULT_NO_DATA,
            max_cells: DEFAULT_MAX_CELLS,
        }
    }
}

impl GridDecoder {
    /// Decode the first message of `raw` into a north-up grid.
    pub fn decode(&self, raw: impl Into<Bytes>) -> Result<Grid, Grib2Error> {
        let raw: Bytes = raw.into();
        if raw.len() < INDICATOR_LEN {
            return Err(Grib2Error::TooShort {
                needed: INDICATOR_LEN,
                available: raw.len(),
            });
        }

        let mut reader = Grib2Reader::new(raw);
        let message = reader.next_message()?.ok_or(Grib2Error::NoMessages)?;

        let cells = cell_count(message.width(), message.height())?;
        if cells > self.max_cells {
            return Err(Grib2Error::GridTooLarge {
                cells,
                limit: self.max_cells,
            });
        }

        let grid = message.to_grid(self.no_data)?;

        let mut skipped = 0usize;
        while let Ok(Some(_)) = reader.next_message() {
            skipped += 1;
        }
        if skipped > 0 {
            warn!(skipped, "Only the first GRIB2 message is rendered");
        }

        info!(
            width = grid.width(),
            height = grid.height(),
            parameter = %grid.metadata().parameter,
            level = %grid.metadata().level,
            valid_cells = grid.valid_count(),
            "Decoded GRIB2 grid"
        );

        Ok(grid)
    }
}

/// Decode the first message of a raw GRIB2 buffer with default limits.
pub fn decode_grid(raw: impl Into<Bytes>) -> Result<Grid, Grib2Error> {
    GridDecoder::default().decode(raw)
}

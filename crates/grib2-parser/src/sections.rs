//! GRIB2 section parsing.
//!
//! A GRIB2 message is an indicator (section 0), a run of length-prefixed
//! sections 1-7, and the `7777` end marker (section 8). Each parser here
//! receives the complete bytes of one section, header included, so offsets
//! below are section-relative and match the octet tables of the WMO manual
//! minus one.

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};
use radar_common::ScanMode;
use tracing::warn;

use crate::tables::{level_description, parameter_short_name};
use crate::Grib2Error;

/// Length of section 0.
pub const INDICATOR_LEN: usize = 16;

/// Section 8 end marker.
pub const END_MARKER: &[u8; 4] = b"7777";

/// Section 0: Indicator Section (16 bytes)
#[derive(Debug, Clone)]
pub struct Indicator {
    pub discipline: u8,
    pub edition: u8,
    pub message_length: u64,
}

/// Section 1: Identification Section
#[derive(Debug, Clone)]
pub struct Identification {
    pub center: u16,
    pub sub_center: u16,
    pub table_version: u8,
    pub local_table_version: u8,
    pub significance_of_reference_time: u8,
    pub reference_time: Option<DateTime<Utc>>,
    pub production_status: u8,
    pub data_type: u8,
}

/// Section 3: Grid Definition Section (template 3.0, regular lat/lon)
#[derive(Debug, Clone)]
pub struct GridDefinition {
    pub template: u16,
    pub num_data_points: u32,
    pub earth_shape: u8,
    /// Points along a parallel (grid width)
    pub ni: u32,
    /// Points along a meridian (grid height)
    pub nj: u32,
    /// First grid point, degrees
    pub first_latitude: f64,
    pub first_longitude: f64,
    /// Last grid point, degrees
    pub last_latitude: f64,
    pub last_longitude: f64,
    /// i direction increment, degrees (None when flagged missing)
    pub di: Option<f64>,
    /// j direction increment, degrees (None when flagged missing)
    pub dj: Option<f64>,
    pub scanning_flags: u8,
    pub scan_mode: ScanMode,
}

impl GridDefinition {
    /// Longitude spacing, derived from the corners when Di is missing.
    pub fn longitude_step(&self) -> f64 {
        self.di.unwrap_or_else(|| {
            if self.ni > 1 {
                ((self.last_longitude - self.first_longitude).rem_euclid(360.0)) / (self.ni - 1) as f64
            } else {
                0.0
            }
        })
    }

    /// Latitude spacing, derived from the corners when Dj is missing.
    pub fn latitude_step(&self) -> f64 {
        self.dj.unwrap_or_else(|| {
            if self.nj > 1 {
                (self.last_latitude - self.first_latitude).abs() / (self.nj - 1) as f64
            } else {
                0.0
            }
        })
    }
}

/// Section 4: Product Definition Section
#[derive(Debug, Clone)]
pub struct ProductDefinition {
    pub template: u16,
    pub parameter_category: u8,
    pub parameter_number: u8,
    pub parameter_short_name: String,
    pub level_type: u8,
    pub level_value: f64,
    pub level_description: String,
    pub forecast_time: u32,
}

/// Packing schemes this crate can unpack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackingMethod {
    /// Template 5.0
    Simple,
    /// Template 5.41
    Png,
}

/// Section 5: Data Representation Section
#[derive(Debug, Clone)]
pub struct DataRepresentation {
    /// Number of points that carry packed values
    pub num_data_points: u32,
    pub template: u16,
    pub packing: PackingMethod,
    pub reference_value: f32,
    pub binary_scale_factor: i16,
    pub decimal_scale_factor: i16,
    pub bits_per_value: u8,
    pub original_data_type: u8,
}

/// Section 6: Bitmap Section
#[derive(Debug, Clone)]
pub struct Bitmap {
    pub indicator: u8,
    /// One bit per grid point, MSB first; 1 = value present
    pub data: Bytes,
}

/// Section 7: Data Section
#[derive(Debug, Clone)]
pub struct DataSection {
    pub data: Bytes,
}

// ===== Parsing Functions =====

/// Parse Section 0 (Indicator) from the start of a message.
pub fn parse_indicator(data: &[u8]) -> Result<Indicator, Grib2Error> {
    if data.len() < INDICATOR_LEN {
        return Err(Grib2Error::TooShort {
            needed: INDICATOR_LEN,
            available: data.len(),
        });
    }

    if &data[0..4] != b"GRIB" {
        return Err(Grib2Error::InvalidMagic([data[0], data[1], data[2], data[3]]));
    }

    // Octets 5-6 reserved, 7 discipline, 8 edition, 9-16 total length
    let discipline = data[6];
    let edition = data[7];
    if edition != 2 {
        return Err(Grib2Error::UnsupportedEdition(edition));
    }

    let message_length = u64::from_be_bytes(read_array(&data[8..16]));

    Ok(Indicator {
        discipline,
        edition,
        message_length,
    })
}

/// Parse Section 1 (Identification).
pub fn parse_identification(section: &[u8]) -> Result<Identification, Grib2Error> {
    require_len(section, 1, 21)?;

    let center = read_u16(section, 5);
    let sub_center = read_u16(section, 7);
    let year = read_u16(section, 12);
    let (month, day, hour, minute, second) =
        (section[14], section[15], section[16], section[17], section[18]);

    let reference_time = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .and_then(|date| date.and_hms_opt(hour as u32, minute as u32, second as u32))
        .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc));

    if reference_time.is_none() {
        warn!(
            year,
            month, day, hour, minute, second, "GRIB2 reference time is not a valid date"
        );
    }

    Ok(Identification {
        center,
        sub_center,
        table_version: section[9],
        local_table_version: section[10],
        significance_of_reference_time: section[11],
        reference_time,
        production_status: section[19],
        data_type: section[20],
    })
}

/// Parse Section 3 (Grid Definition).
///
/// Only template 3.0 (latitude/longitude, a.k.a. equidistant cylindrical) is
/// supported; MRMS and the global NWP grids use it.
pub fn parse_grid_definition(section: &[u8]) -> Result<GridDefinition, Grib2Error> {
    require_len(section, 3, 14)?;

    // 5: source, 6-9: number of points, 10: optional list octets,
    // 11: optional list interpretation, 12-13: template number
    let num_data_points = read_u32(section, 6);
    let template = read_u16(section, 12);
    if template != 0 {
        return Err(Grib2Error::UnsupportedTemplate { section: 3, template });
    }
    require_len(section, 3, 14 + 58)?;

    // Template 3.0, relative to octet 15:
    //  0      shape of the earth
    //  16-19  Ni, 20-23 Nj
    //  24-27  basic angle, 28-31 subdivisions
    //  32-35  La1, 36-39 Lo1, 40 resolution flags
    //  41-44  La2, 45-48 Lo2, 49-52 Di, 53-56 Dj, 57 scanning mode
    let gd = &section[14..];
    let ni = read_u32(gd, 16);
    let nj = read_u32(gd, 20);
    let unit = angle_unit(read_u32(gd, 24), read_u32(gd, 28));

    let la1 = decode_grib2_signed(&gd[32..36]) as f64 * unit;
    let lo1 = decode_grib2_signed(&gd[36..40]) as f64 * unit;
    let la2 = decode_grib2_signed(&gd[41..45]) as f64 * unit;
    let lo2 = decode_grib2_signed(&gd[45..49]) as f64 * unit;
    let di = increment(read_u32(gd, 49), unit);
    let dj = increment(read_u32(gd, 53), unit);
    let scanning_flags = gd[57];

    if ni as u64 * nj as u64 != num_data_points as u64 {
        return Err(Grib2Error::InvalidSection {
            section: 3,
            reason: format!("{}x{} grid declares {} data points", ni, nj, num_data_points),
        });
    }

    Ok(GridDefinition {
        template,
        num_data_points,
        earth_shape: gd[0],
        ni,
        nj,
        first_latitude: la1,
        first_longitude: lo1,
        last_latitude: la2,
        last_longitude: lo2,
        di,
        dj,
        scanning_flags,
        scan_mode: ScanMode::from_grib2_flag(scanning_flags),
    })
}

/// Parse Section 4 (Product Definition).
pub fn parse_product_definition(
    section: &[u8],
    discipline: u8,
) -> Result<ProductDefinition, Grib2Error> {
    require_len(section, 4, 11)?;

    // 5-6: coordinate values after template, 7-8: template number,
    // 9: parameter category, 10: parameter number
    let template = read_u16(section, 7);
    let parameter_category = section[9];
    let parameter_number = section[10];

    // Templates 4.0-4.15 share the horizontal-level layout:
    // 18-21 forecast time, 22 first surface type, 23 scale, 24-27 scaled value
    let (forecast_time, level_type, level_value) = if template <= 15 && section.len() >= 28 {
        // Both fields are sign-magnitude; all bits set means missing
        let scale = if section[23] == 0xFF {
            0
        } else {
            decode_grib2_signed_i8(section[23])
        };
        let value = if read_u32(section, 24) == u32::MAX {
            0.0
        } else {
            let scaled = decode_grib2_signed(&section[24..28]) as f64;
            if scale >= 0 {
                scaled / 10f64.powi(scale as i32)
            } else {
                scaled * 10f64.powi(-(scale as i32))
            }
        };
        (read_u32(section, 18), section[22], value)
    } else {
        (0, 255, 0.0)
    };

    Ok(ProductDefinition {
        template,
        parameter_category,
        parameter_number,
        parameter_short_name: parameter_short_name(discipline, parameter_category, parameter_number),
        level_type,
        level_value,
        level_description: level_description(level_type, level_value),
        forecast_time,
    })
}

/// Parse Section 5 (Data Representation).
pub fn parse_data_representation(section: &[u8]) -> Result<DataRepresentation, Grib2Error> {
    require_len(section, 5, 11)?;

    let num_data_points = read_u32(section, 5);
    let template = read_u16(section, 9);
    let packing = match template {
        0 => PackingMethod::Simple,
        41 => PackingMethod::Png,
        _ => return Err(Grib2Error::UnsupportedTemplate { section: 5, template }),
    };

    // Templates 5.0 and 5.41 share the same leading fields:
    // 11-14 reference value (IEEE f32), 15-16 binary scale E,
    // 17-18 decimal scale D, 19 bits per value, 20 original field type
    require_len(section, 5, 21)?;

    Ok(DataRepresentation {
        num_data_points,
        template,
        packing,
        reference_value: f32::from_be_bytes(read_array(&section[11..15])),
        binary_scale_factor: decode_grib2_signed_i16(&section[15..17]),
        decimal_scale_factor: decode_grib2_signed_i16(&section[17..19]),
        bits_per_value: section[19],
        original_data_type: section[20],
    })
}

/// Parse Section 6 (Bitmap). Returns `None` when no bitmap applies.
pub fn parse_bitmap(section: Bytes) -> Result<Option<Bitmap>, Grib2Error> {
    require_len(&section, 6, 6)?;

    let indicator = section[5];
    match indicator {
        255 => Ok(None),
        0 => Ok(Some(Bitmap {
            indicator,
            data: section.slice(6..),
        })),
        254 => Err(Grib2Error::InvalidSection {
            section: 6,
            reason: "bitmap refers to a previously defined bitmap".to_string(),
        }),
        _ => Err(Grib2Error::InvalidSection {
            section: 6,
            reason: format!("predefined bitmap {} is not supported", indicator),
        }),
    }
}

/// Parse Section 7 (Data).
pub fn parse_data_section(section: Bytes) -> Result<DataSection, Grib2Error> {
    require_len(&section, 7, 5)?;
    Ok(DataSection {
        data: section.slice(5..),
    })
}

// ===== Helper Functions =====

/// Decode a GRIB2 sign-magnitude integer (MSB is the sign bit).
///
/// GRIB2 does not use two's complement for signed fields. Slices that are
/// not exactly 4 bytes long decode to 0.
pub fn decode_grib2_signed(bytes: &[u8]) -> i32 {
    if bytes.len() != 4 {
        return 0;
    }
    let raw = u32::from_be_bytes(read_array(bytes));
    let magnitude = (raw & 0x7FFF_FFFF) as i32;
    if raw & 0x8000_0000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// 2-byte variant of [`decode_grib2_signed`], used for scale factors.
pub fn decode_grib2_signed_i16(bytes: &[u8]) -> i16 {
    if bytes.len() != 2 {
        return 0;
    }
    let raw = u16::from_be_bytes([bytes[0], bytes[1]]);
    let magnitude = (raw & 0x7FFF) as i16;
    if raw & 0x8000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// 1-byte variant of [`decode_grib2_signed`], used for level scale factors.
pub fn decode_grib2_signed_i8(byte: u8) -> i8 {
    let magnitude = (byte & 0x7F) as i8;
    if byte & 0x80 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Degrees per unit for template 3.0 angles.
fn angle_unit(basic_angle: u32, subdivisions: u32) -> f64 {
    if basic_angle == 0 || basic_angle == u32::MAX || subdivisions == 0 || subdivisions == u32::MAX {
        1e-6
    } else {
        basic_angle as f64 / subdivisions as f64
    }
}

fn increment(raw: u32, unit: f64) -> Option<f64> {
    (raw != u32::MAX).then(|| raw as f64 * unit)
}

fn require_len(section: &[u8], number: u8, min: usize) -> Result<(), Grib2Error> {
    if section.len() < min {
        return Err(Grib2Error::InvalidSection {
            section: number,
            reason: format!("needs at least {} bytes, got {}", min, section.len()),
        });
    }
    Ok(())
}

fn read_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

pub(crate) fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes(read_array(&data[offset..offset + 2]))
}

pub(crate) fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes(read_array(&data[offset..offset + 4]))
}

//! Synthetic GRIB2 message builder.
//!
//! Creates small but structurally valid GRIB2 messages for parser and
//! pipeline tests: regular lat/lon grids with simple or PNG packing, optional
//! bitmaps and any scan order.

use std::io::Cursor;

use image::{DynamicImage, ImageBuffer, ImageFormat, Luma};

/// How the builder packs data values into section 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packing {
    /// Template 5.0 with the given bit width (1..=32)
    Simple(u8),
    /// Template 5.41, 16-bit grayscale PNG
    Png,
}

/// Build a minimal GRIB2 message with the specified parameters
#[derive(Debug, Clone)]
pub struct Grib2Builder {
    discipline: u8,
    center: u16,
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    // Grid definition
    ni: u32,
    nj: u32,
    la1: i32, // first lat (microdegrees)
    lo1: i32, // first lon (microdegrees)
    la2: i32, // last lat (microdegrees)
    lo2: i32, // last lon (microdegrees)
    di: u32,  // lon increment (microdegrees)
    dj: u32,  // lat increment (microdegrees)
    scanning_mode: u8,
    // Product definition
    param_category: u8,
    param_number: u8,
    level_type: u8,
    level_scale: i8,
    level_value: i32,
    // Data
    packing: Packing,
    decimal_scale: i16,
    /// Values in native scan order; `None` marks a bitmap-masked point
    data_values: Vec<Option<f32>>,
    force_bitmap: bool,
    data_truncation: usize,
}

impl Grib2Builder {
    /// MRMS-like reflectivity message: 20x15 grid at 0.01° over northern CONUS,
    /// filled with the MRMS "missing" value.
    pub fn new_mrms() -> Self {
        let ni = 20;
        let nj = 15;
        Self {
            discipline: 209, // MRMS local discipline
            center: 161,     // NSSL
            year: 2024,
            month: 6,
            day: 14,
            hour: 22,
            minute: 2,
            ni,
            nj,
            la1: 54_995_000,  // 54.995°N
            lo1: 230_005_000, // 230.005°E = -129.995°
            la2: 54_855_000,  // 54.855°N
            lo2: 230_195_000, // 230.195°E = -129.805°
            di: 10_000,       // 0.01°
            dj: 10_000,       // 0.01°
            scanning_mode: 0b0000_0000, // +i, -j: north-west corner first
            param_category: 0,
            param_number: 16, // REFL
            level_type: 102,
            level_scale: 0,
            level_value: 500,
            packing: Packing::Simple(16),
            decimal_scale: 1,
            data_values: vec![Some(-999.0); (ni * nj) as usize],
            force_bitmap: false,
            data_truncation: 0,
        }
    }

    /// Small grid over the San Francisco Bay Area.
    ///
    /// Bounds of the grid points: 37.5..38.0 N, -123.0..-122.0 E, so the
    /// spacing is `1° / (ni - 1)` by `0.5° / (nj - 1)` (1° x 0.5° for 2x2).
    pub fn bay_area(ni: u32, nj: u32) -> Self {
        let di = if ni > 1 { 1_000_000 / (ni - 1) } else { 0 };
        let dj = if nj > 1 { 500_000 / (nj - 1) } else { 0 };
        Self {
            discipline: 209,
            center: 161,
            ni,
            nj,
            la1: 38_000_000,
            lo1: 237_000_000, // -123.0
            la2: 37_500_000,
            lo2: 238_000_000, // -122.0
            di,
            dj,
            decimal_scale: 0,
            data_values: vec![Some(0.0); (ni * nj) as usize],
            ..Self::new_mrms()
        }
    }

    pub fn with_reference_time(mut self, year: u16, month: u8, day: u8, hour: u8) -> Self {
        self.year = year;
        self.month = month;
        self.day = day;
        self.hour = hour;
        self.minute = 0;
        self
    }

    /// Corner points in degrees, first point then last point.
    pub fn with_corners(mut self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Self {
        self.la1 = (lat1 * 1e6).round() as i32;
        self.lo1 = (lon1 * 1e6).round() as i32;
        self.la2 = (lat2 * 1e6).round() as i32;
        self.lo2 = (lon2 * 1e6).round() as i32;
        self
    }

    pub fn with_scanning_mode(mut self, flags: u8) -> Self {
        self.scanning_mode = flags;
        self
    }

    pub fn with_parameter(mut self, discipline: u8, category: u8, number: u8) -> Self {
        self.discipline = discipline;
        self.param_category = category;
        self.param_number = number;
        self
    }

    /// First fixed surface as `scaled_value / 10^scale`.
    pub fn with_level(mut self, level_type: u8, scale: i8, scaled_value: i32) -> Self {
        self.level_type = level_type;
        self.level_scale = scale;
        self.level_value = scaled_value;
        self
    }

    pub fn with_packing(mut self, packing: Packing) -> Self {
        self.packing = packing;
        self
    }

    pub fn with_decimal_scale(mut self, decimal_scale: i16) -> Self {
        self.decimal_scale = decimal_scale;
        self
    }

    pub fn with_constant_value(mut self, value: f32) -> Self {
        self.data_values = vec![Some(value); (self.ni * self.nj) as usize];
        self
    }

    /// Values in native scan order. The length must be `ni * nj`.
    pub fn with_data(mut self, data: Vec<f32>) -> Self {
        self.data_values = data.into_iter().map(Some).collect();
        self
    }

    /// Values where `None` is masked out through a section 6 bitmap.
    pub fn with_masked_data(mut self, data: Vec<Option<f32>>) -> Self {
        self.data_values = data;
        self.force_bitmap = true;
        self
    }

    /// Drop `bytes` from the end of the packed data while keeping every
    /// section length consistent.
    pub fn with_truncated_data(mut self, bytes: usize) -> Self {
        self.data_truncation = bytes;
        self
    }

    /// Build the complete GRIB2 message bytes
    pub fn build(&self) -> Vec<u8> {
        assert_eq!(
            self.data_values.len(),
            (self.ni * self.nj) as usize,
            "data length must match the grid"
        );

        let sections = [
            self.build_section1(),
            self.build_section3(),
            self.build_section4(),
            self.build_section5(),
            self.build_section6(),
            self.build_section7(),
        ];
        let message_length = 16 + sections.iter().map(Vec::len).sum::<usize>() + 4;

        let mut message = Vec::with_capacity(message_length);
        message.extend_from_slice(b"GRIB");
        message.extend_from_slice(&[0, 0]);
        message.push(self.discipline);
        message.push(2); // Edition 2
        message.extend_from_slice(&(message_length as u64).to_be_bytes());
        for section in &sections {
            message.extend_from_slice(section);
        }
        message.extend_from_slice(b"7777");

        message
    }

    fn present_values(&self) -> Vec<f32> {
        self.data_values.iter().flatten().copied().collect()
    }

    fn uses_bitmap(&self) -> bool {
        self.force_bitmap || self.data_values.iter().any(Option::is_none)
    }

    fn build_section1(&self) -> Vec<u8> {
        let mut section = header(21, 1);
        section.extend_from_slice(&self.center.to_be_bytes());
        section.extend_from_slice(&0u16.to_be_bytes()); // Sub-center
        section.push(2); // Master table version
        section.push(1); // Local table version
        section.push(0); // Significance of reference time (analysis)
        section.extend_from_slice(&self.year.to_be_bytes());
        section.extend_from_slice(&[self.month, self.day, self.hour, self.minute, 0]);
        section.push(0); // Production status (operational)
        section.push(0); // Type of data (analysis)
        section
    }

    fn build_section3(&self) -> Vec<u8> {
        let mut section = header(14 + 58, 3);
        section.push(0); // Source of grid definition
        section.extend_from_slice(&(self.ni * self.nj).to_be_bytes());
        section.push(0); // Number of octets for optional list
        section.push(0); // Interpretation of optional list
        section.extend_from_slice(&0u16.to_be_bytes()); // Template 3.0

        section.push(6); // Shape of Earth (spherical, 6371229 m)
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());

        section.extend_from_slice(&self.ni.to_be_bytes());
        section.extend_from_slice(&self.nj.to_be_bytes());
        section.extend_from_slice(&0u32.to_be_bytes()); // Basic angle
        section.extend_from_slice(&u32::MAX.to_be_bytes()); // Subdivisions (missing)

        section.extend_from_slice(&encode_signed_i32(self.la1));
        section.extend_from_slice(&encode_signed_i32(self.lo1));
        section.push(48); // Resolution and component flags
        section.extend_from_slice(&encode_signed_i32(self.la2));
        section.extend_from_slice(&encode_signed_i32(self.lo2));
        section.extend_from_slice(&self.di.to_be_bytes());
        section.extend_from_slice(&self.dj.to_be_bytes());
        section.push(self.scanning_mode);
        section
    }

    fn build_section4(&self) -> Vec<u8> {
        let mut section = header(34, 4);
        section.extend_from_slice(&0u16.to_be_bytes()); // Coordinate values
        section.extend_from_slice(&0u16.to_be_bytes()); // Template 4.0
        section.push(self.param_category);
        section.push(self.param_number);
        section.push(0); // Type of generating process (analysis)
        section.push(0); // Background process
        section.push(0); // Analysis or forecast process
        section.extend_from_slice(&0u16.to_be_bytes()); // Hours of cutoff
        section.push(0); // Minutes of cutoff
        section.push(0); // Time range unit (minutes)
        section.extend_from_slice(&0u32.to_be_bytes()); // Forecast time
        section.push(self.level_type);
        section.push(encode_signed_i8(self.level_scale));
        section.extend_from_slice(&encode_signed_i32(self.level_value));
        section.push(255); // Second fixed surface (none)
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());
        section
    }

    fn build_section5(&self) -> Vec<u8> {
        let params = self.packing_params();
        let mut section = header(21, 5);
        section.extend_from_slice(&(self.present_values().len() as u32).to_be_bytes());
        let template: u16 = match self.packing {
            Packing::Simple(_) => 0,
            Packing::Png => 41,
        };
        section.extend_from_slice(&template.to_be_bytes());
        section.extend_from_slice(&params.reference.to_be_bytes());
        section.extend_from_slice(&encode_signed_i16(params.binary_scale));
        section.extend_from_slice(&encode_signed_i16(self.decimal_scale));
        section.push(params.bits);
        section.push(0); // Original field type (floating point)
        section
    }

    fn build_section6(&self) -> Vec<u8> {
        if !self.uses_bitmap() {
            let mut section = header(6, 6);
            section.push(255); // No bitmap
            return section;
        }

        let bytes = self.data_values.len().div_ceil(8);
        let mut bits = vec![0u8; bytes];
        for (i, value) in self.data_values.iter().enumerate() {
            if value.is_some() {
                bits[i / 8] |= 0x80 >> (i % 8);
            }
        }
        let mut section = header(6 + bytes as u32, 6);
        section.push(0); // Bitmap follows
        section.extend_from_slice(&bits);
        section
    }

    fn build_section7(&self) -> Vec<u8> {
        let mut packed = self.pack();
        packed.truncate(packed.len().saturating_sub(self.data_truncation));

        let mut section = header(5 + packed.len() as u32, 7);
        section.extend_from_slice(&packed);
        section
    }

    fn packing_params(&self) -> PackingParams {
        let bits = match self.packing {
            Packing::Simple(bits) => bits,
            Packing::Png => 16,
        };
        let decimal = 10f64.powi(self.decimal_scale as i32);
        let scaled: Vec<f64> = self.present_values().iter().map(|&v| v as f64 * decimal).collect();
        let (min, max) = scaled
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

        if scaled.is_empty() || max == min {
            return PackingParams {
                reference: if scaled.is_empty() { 0.0 } else { min as f32 },
                binary_scale: 0,
                bits: 0,
            };
        }

        let max_packed = ((1u64 << bits) - 1) as f64;
        let binary_scale = if (max - min).round() <= max_packed {
            0
        } else {
            ((max - min) / max_packed).log2().ceil() as i16
        };

        PackingParams {
            reference: min as f32,
            binary_scale,
            bits,
        }
    }

    fn packed_integers(&self) -> Vec<u32> {
        let params = self.packing_params();
        let decimal = 10f64.powi(self.decimal_scale as i32);
        let step = 2f64.powi(params.binary_scale as i32);
        self.present_values()
            .iter()
            .map(|&v| ((v as f64 * decimal - params.reference as f64) / step).round() as u32)
            .collect()
    }

    fn pack(&self) -> Vec<u8> {
        let params = self.packing_params();
        if params.bits == 0 {
            return Vec::new();
        }
        let values = self.packed_integers();

        match self.packing {
            Packing::Simple(bits) => pack_bits(&values, bits),
            Packing::Png => {
                let width = values.len() as u32;
                let raw: Vec<u16> = values.iter().map(|&v| v as u16).collect();
                let buf: ImageBuffer<Luma<u16>, Vec<u16>> =
                    ImageBuffer::from_raw(width, 1, raw).expect("buffer matches dimensions");
                let mut out = Cursor::new(Vec::new());
                DynamicImage::ImageLuma16(buf)
                    .write_to(&mut out, ImageFormat::Png)
                    .expect("in-memory PNG encoding");
                out.into_inner()
            }
        }
    }
}

struct PackingParams {
    reference: f32,
    binary_scale: i16,
    bits: u8,
}

fn header(length: u32, number: u8) -> Vec<u8> {
    let mut section = Vec::with_capacity(length as usize);
    section.extend_from_slice(&length.to_be_bytes());
    section.push(number);
    section
}

/// Pack unsigned values MSB-first into `bits`-wide fields.
pub fn pack_bits(values: &[u32], bits: u8) -> Vec<u8> {
    let total_bits = values.len() * bits as usize;
    let mut out = vec![0u8; total_bits.div_ceil(8)];
    let mut pos = 0usize;
    for &value in values {
        for b in (0..bits).rev() {
            if (value >> b) & 1 == 1 {
                out[pos / 8] |= 0x80 >> (pos % 8);
            }
            pos += 1;
        }
    }
    out
}

/// GRIB2 sign-magnitude encoding of a 4-byte integer.
pub fn encode_signed_i32(value: i32) -> [u8; 4] {
    let magnitude = value.unsigned_abs() & 0x7FFF_FFFF;
    let raw = if value < 0 { magnitude | 0x8000_0000 } else { magnitude };
    raw.to_be_bytes()
}

/// GRIB2 sign-magnitude encoding of a 1-byte integer.
pub fn encode_signed_i8(value: i8) -> u8 {
    let magnitude = value.unsigned_abs() & 0x7F;
    if value < 0 {
        magnitude | 0x80
    } else {
        magnitude
    }
}

/// GRIB2 sign-magnitude encoding of a 2-byte integer.
pub fn encode_signed_i16(value: i16) -> [u8; 2] {
    let magnitude = value.unsigned_abs() & 0x7FFF;
    let raw = if value < 0 { magnitude | 0x8000 } else { magnitude };
    raw.to_be_bytes()
}

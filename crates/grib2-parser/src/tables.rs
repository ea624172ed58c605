//! GRIB2 parameter and level lookup tables.
//!
//! Only the entries relevant to radar and surface products are listed;
//! anything else falls back to a `P{discipline}_{category}_{number}` name.

/// Short name for a (discipline, category, number) parameter triple.
pub fn parameter_short_name(discipline: u8, category: u8, number: u8) -> String {
    let name = match (discipline, category, number) {
        // Discipline 0: meteorological products
        (0, 0, 0) => "TMP",
        (0, 1, 7) => "PRATE",
        (0, 1, 8) => "APCP",
        (0, 16, 195) => "REFD",
        (0, 16, 196) => "REFC",
        (0, 16, 197) => "RETOP",
        (0, 16, 198) => "MAXREF",
        (0, 17, 192) => "LTNG",

        // Discipline 209: MRMS local use
        (209, 0, 16) => "REFL",
        (209, 1, 0) => "PRECIP_RATE",
        (209, 1, 1) => "QPE",

        _ => return format!("P{}_{}_{}", discipline, category, number),
    };
    name.to_string()
}

/// Human readable description of a fixed surface (Code Table 4.5).
pub fn level_description(level_type: u8, level_value: f64) -> String {
    match level_type {
        1 => "surface".to_string(),
        10 | 200 => "entire atmosphere".to_string(),
        100 => format!("{} mb", level_value / 100.0),
        101 => "mean sea level".to_string(),
        102 => format!("{} m above MSL", level_value),
        103 => format!("{} m above ground", level_value),
        255 => "unspecified".to_string(),
        _ => format!("level type {} value {}", level_type, level_value),
    }
}

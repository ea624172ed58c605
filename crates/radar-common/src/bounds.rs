//! Geographic bounding rectangle of a decoded grid.

use serde::{Deserialize, Serialize};

/// A geographic bounding box in degrees.
///
/// `west` is kept in -180..180 (see [`normalize_longitude`]). `east` is
/// normally in the same range but sits above 180 for boxes built by
/// [`GeoBounds::from_corners`] or [`GeoBounds::expand`] that run past 180°E.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl GeoBounds {
    /// Create a bounding box from its four edges.
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    /// Build bounds from the first and last grid points of a lat/lon grid.
    ///
    /// The corners may come in any scan order. `west` is normalized into
    /// -180..180 and `east` is `west` plus the eastward span, so `east >= west`
    /// holds even for grids running past 180°E (and may then exceed 180).
    pub fn from_corners(lat1: f64, lon1: f64, lat2: f64, lon2: f64, i_negative: bool) -> Self {
        let (lon_w, lon_e) = if i_negative { (lon2, lon1) } else { (lon1, lon2) };
        let west = normalize_longitude(lon_w);
        Self {
            south: lat1.min(lat2),
            north: lat1.max(lat2),
            west,
            east: west + (lon_e - lon_w).rem_euclid(360.0),
        }
    }

    /// Latitude extent in degrees.
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Longitude extent in degrees, accounting for antimeridian crossing.
    pub fn width(&self) -> f64 {
        if self.east >= self.west {
            self.east - self.west
        } else {
            self.east + 360.0 - self.west
        }
    }

    /// Grow the box by `dlat` degrees north/south and `dlon` degrees east/west.
    ///
    /// Latitudes are clamped to the poles and the longitude span to a full
    /// turn. The result keeps `east >= west`.
    pub fn expand(&self, dlat: f64, dlon: f64) -> Self {
        let west = normalize_longitude(self.west - dlon);
        Self {
            south: (self.south - dlat).max(-90.0),
            north: (self.north + dlat).min(90.0),
            west,
            east: west + (self.width() + 2.0 * dlon).min(360.0),
        }
    }

    /// Check if a point is contained within this box.
    pub fn contains_point(&self, lat: f64, lon: f64) -> bool {
        let offset = (lon - self.west).rem_euclid(360.0);
        lat >= self.south && lat <= self.north && offset <= self.width()
    }

    /// Corner pairs in the `[[south, west], [north, east]]` shape map overlays take.
    pub fn corners(&self) -> [[f64; 2]; 2] {
        [[self.south, self.west], [self.north, self.east]]
    }
}

/// Map a longitude in any convention (e.g. GRIB's 0..360) into -180..180.
pub fn normalize_longitude(lon: f64) -> f64 {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    // keep +180 as +180 rather than folding it to -180
    if wrapped == -180.0 && lon > 0.0 {
        180.0
    } else {
        wrapped
    }
}

//! Coordinates, viewport bounds, and distance helpers

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const MAX_LNG: f64 = 180.0;
pub const MAX_LAT: f64 = 85.0;

const EARTH_RADIUS_MILES: f64 = 3958.8;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GeoError {
    #[error("Invalid bbox")]
    InvalidBounds,
    #[error("Invalid radius: {0}")]
    InvalidRadius(f64),
    #[error("Invalid coordinates format. Expected 'latitude, longitude'.")]
    CoordsFormat,
    #[error("Invalid coordinates format. Could not parse numbers.")]
    CoordsNumber,
}

pub fn clamp(n: f64, min: f64, max: f64) -> f64 {
    n.max(min).min(max)
}

/// Rectangular area of the map. Always normalized: min <= max on both
/// axes and both axes clamped to the renderable range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "BoundsFields")]
pub struct Bounds {
    pub min_lng: f64,
    pub min_lat: f64,
    pub max_lng: f64,
    pub max_lat: f64,
}

/// Wire form of `Bounds`, validated through `Bounds::new`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoundsFields {
    min_lng: f64,
    min_lat: f64,
    max_lng: f64,
    max_lat: f64,
}

impl TryFrom<BoundsFields> for Bounds {
    type Error = GeoError;

    fn try_from(b: BoundsFields) -> Result<Self, Self::Error> {
        Bounds::new(b.min_lng, b.min_lat, b.max_lng, b.max_lat)
    }
}

impl Bounds {
    pub fn new(min_lng: f64, min_lat: f64, max_lng: f64, max_lat: f64) -> Result<Self, GeoError> {
        let values = [min_lng, min_lat, max_lng, max_lat];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(GeoError::InvalidBounds);
        }
        // Maps report longitudes past the antimeridian when wrapped once,
        // anything past that is not a coordinate
        if [min_lat, max_lat].iter().any(|v| v.abs() > 90.0)
            || [min_lng, max_lng].iter().any(|v| v.abs() > 360.0)
        {
            return Err(GeoError::InvalidBounds);
        }

        let (min_lng, max_lng) = ordered(min_lng, max_lng);
        let (min_lat, max_lat) = ordered(min_lat, max_lat);

        Ok(Self {
            min_lng: clamp(min_lng, -MAX_LNG, MAX_LNG),
            max_lng: clamp(max_lng, -MAX_LNG, MAX_LNG),
            min_lat: clamp(min_lat, -MAX_LAT, MAX_LAT),
            max_lat: clamp(max_lat, -MAX_LAT, MAX_LAT),
        })
    }

    /// Smallest bounds containing a circle of `radius_miles` around a point.
    pub fn around(center: Point, radius_miles: f64) -> Result<Self, GeoError> {
        if !radius_miles.is_finite() || radius_miles <= 0.0 {
            return Err(GeoError::InvalidRadius(radius_miles));
        }
        let lat_delta = (radius_miles / EARTH_RADIUS_MILES).to_degrees();
        let cos_lat = center.lat.to_radians().cos().abs().max(1e-6);
        let lng_delta = (lat_delta / cos_lat).min(MAX_LNG);
        Self::new(
            clamp(center.lng - lng_delta, -MAX_LNG, MAX_LNG),
            clamp(center.lat - lat_delta, -90.0, 90.0),
            clamp(center.lng + lng_delta, -MAX_LNG, MAX_LNG),
            clamp(center.lat + lat_delta, -90.0, 90.0),
        )
    }

    pub fn center(&self) -> Point {
        Point {
            lat: (self.min_lat + self.max_lat) / 2.0,
            lng: (self.min_lng + self.max_lng) / 2.0,
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        point.lng >= self.min_lng
            && point.lng <= self.max_lng
            && point.lat >= self.min_lat
            && point.lat <= self.max_lat
    }

    pub fn intersect(&self, other: &Bounds) -> Option<Bounds> {
        let min_lng = self.min_lng.max(other.min_lng);
        let max_lng = self.max_lng.min(other.max_lng);
        let min_lat = self.min_lat.max(other.min_lat);
        let max_lat = self.max_lat.min(other.max_lat);
        if min_lng > max_lng || min_lat > max_lat {
            return None;
        }
        Some(Bounds {
            min_lng,
            min_lat,
            max_lng,
            max_lat,
        })
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b { (a, b) } else { (b, a) }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lng: f64,
}

impl Point {
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && self.lat.abs() <= 90.0
            && self.lng.abs() <= 180.0
    }

    /// Great-circle distance using the haversine formula.
    pub fn distance_miles(&self, other: &Point) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_MILES * a.sqrt().asin()
    }
}

/// Search radius in miles. The UI offers 5, 10, and 20.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64")]
pub struct DistanceFilter(f64);

impl TryFrom<f64> for DistanceFilter {
    type Error = GeoError;

    fn try_from(radius: f64) -> Result<Self, Self::Error> {
        DistanceFilter::miles(radius)
    }
}

impl DistanceFilter {
    pub fn miles(radius: f64) -> Result<Self, GeoError> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(GeoError::InvalidRadius(radius));
        }
        Ok(Self(radius))
    }

    pub fn as_miles(&self) -> f64 {
        self.0
    }
}

impl Default for DistanceFilter {
    fn default() -> Self {
        Self(5.0)
    }
}

static PARENS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[()]").expect("valid regex"));

/// Parse a `"lat, lng"` string as typed into the admin form. Surrounding
/// parentheses are tolerated.
pub fn parse_coords(input: &str) -> Result<Point, GeoError> {
    let cleaned = PARENS.replace_all(input, "");
    let parts: Vec<&str> = cleaned.split(',').map(str::trim).collect();
    let [lat, lng] = parts.as_slice() else {
        return Err(GeoError::CoordsFormat);
    };
    let lat: f64 = lat.parse().map_err(|_| GeoError::CoordsNumber)?;
    let lng: f64 = lng.parse().map_err(|_| GeoError::CoordsNumber)?;
    let point = Point { lat, lng };
    if !point.is_valid() {
        return Err(GeoError::CoordsNumber);
    }
    Ok(point)
}

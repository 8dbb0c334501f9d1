//! Public types for the map API
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize};

use crate::geo::{Bounds, DistanceFilter, GeoError, Point};
use crate::time_window::TimeFilter;

/// One event rendered as a marker. Column names follow the event table,
/// the vendor join columns are camel cased.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPin {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub address: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "vendorId", default)]
    pub vendor_id: Option<String>,
    #[serde(rename = "vendorName", default)]
    pub vendor_name: Option<String>,
    #[serde(rename = "vendorSlug", default)]
    pub vendor_slug: Option<String>,
}

impl EventPin {
    pub fn point(&self) -> Point {
        Point {
            lat: self.latitude,
            lng: self.longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.point().is_valid()
    }
}

/// Bounding box to scan, plus the circle pins must also fall in when a
/// radius was requested.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchArea {
    pub bounds: Bounds,
    pub circle: Option<(Point, DistanceFilter)>,
}

impl SearchArea {
    pub fn contains(&self, pin: &EventPin) -> bool {
        let point = pin.point();
        self.bounds.contains(point)
            && self
                .circle
                .is_none_or(|(center, radius)| center.distance_miles(&point) <= radius.as_miles())
    }
}

/// Query string of `GET /api/map/search`. Either all four bbox edges or
/// `lat` + `lng` + `radius` (miles) must be present; both may be.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapSearchQuery {
    #[serde(
        default,
        deserialize_with = "coordinate",
        skip_serializing_if = "Option::is_none"
    )]
    pub min_lng: Option<f64>,
    #[serde(
        default,
        deserialize_with = "coordinate",
        skip_serializing_if = "Option::is_none"
    )]
    pub min_lat: Option<f64>,
    #[serde(
        default,
        deserialize_with = "coordinate",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_lng: Option<f64>,
    #[serde(
        default,
        deserialize_with = "coordinate",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_lat: Option<f64>,
    #[serde(
        default,
        deserialize_with = "coordinate",
        skip_serializing_if = "Option::is_none"
    )]
    pub lat: Option<f64>,
    #[serde(
        default,
        deserialize_with = "coordinate",
        skip_serializing_if = "Option::is_none"
    )]
    pub lng: Option<f64>,
    #[serde(
        default,
        deserialize_with = "coordinate",
        skip_serializing_if = "Option::is_none"
    )]
    pub radius: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub when: Option<TimeFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tz: Option<String>,
}

/// Coordinates arrive as free text. Anything that isn't a number becomes
/// NaN so it fails validation along with the rest of the area.
fn coordinate<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(|value| value.parse().unwrap_or(f64::NAN)))
}

impl MapSearchQuery {
    /// Query for everything in the viewport, narrowed to `distance`
    /// around the viewport center when set.
    pub fn for_viewport(
        bounds: Bounds,
        when: TimeFilter,
        distance: Option<DistanceFilter>,
        tz: Tz,
    ) -> Self {
        let center = bounds.center();
        Self {
            min_lng: Some(bounds.min_lng),
            min_lat: Some(bounds.min_lat),
            max_lng: Some(bounds.max_lng),
            max_lat: Some(bounds.max_lat),
            lat: distance.map(|_| center.lat),
            lng: distance.map(|_| center.lng),
            radius: distance.map(|d| d.as_miles()),
            when: Some(when),
            tz: Some(tz.name().to_string()),
        }
    }

    pub fn bounds(&self) -> Result<Option<Bounds>, GeoError> {
        match (self.min_lng, self.min_lat, self.max_lng, self.max_lat) {
            (None, None, None, None) => Ok(None),
            (Some(min_lng), Some(min_lat), Some(max_lng), Some(max_lat)) => {
                Bounds::new(min_lng, min_lat, max_lng, max_lat).map(Some)
            }
            _ => Err(GeoError::InvalidBounds),
        }
    }

    /// Area to scan. Fails when neither a complete bbox nor a complete
    /// circle was given; `Ok(None)` when both were given but don't overlap.
    pub fn area(&self) -> Result<Option<SearchArea>, GeoError> {
        let circle = self.center_radius()?;
        let bounds = match (self.bounds()?, circle) {
            (Some(bbox), None) => bbox,
            (None, Some((center, radius))) => Bounds::around(center, radius.as_miles())?,
            (Some(bbox), Some((center, radius))) => {
                match bbox.intersect(&Bounds::around(center, radius.as_miles())?) {
                    Some(bounds) => bounds,
                    None => return Ok(None),
                }
            }
            (None, None) => return Err(GeoError::InvalidBounds),
        };
        Ok(Some(SearchArea { bounds, circle }))
    }

    pub fn center_radius(&self) -> Result<Option<(Point, DistanceFilter)>, GeoError> {
        match (self.lat, self.lng, self.radius) {
            (None, None, None) => Ok(None),
            (Some(lat), Some(lng), Some(radius)) => {
                let center = Point { lat, lng };
                if !center.is_valid() {
                    return Err(GeoError::InvalidBounds);
                }
                Ok(Some((center, DistanceFilter::miles(radius)?)))
            }
            _ => Err(GeoError::InvalidBounds),
        }
    }
}

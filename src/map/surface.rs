//! Seam between the controller and whatever draws the map.

use crate::api::public::map::EventPin;
use crate::geo::{Bounds, GeoError, Point};
use crate::time_window::TimeCategory;

#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("map container unavailable: {0}")]
    ContainerUnavailable(String),
}

/// Edges exactly as the renderer reports them, possibly wrapped or NaN.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl RawBounds {
    pub fn normalize(self) -> Result<Bounds, GeoError> {
        Bounds::new(self.west, self.south, self.east, self.north)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapOptions {
    pub center: Point,
    pub zoom: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerStyle {
    pub color: &'static str,
    pub category: TimeCategory,
}

impl MarkerStyle {
    pub fn for_category(category: TimeCategory) -> Self {
        let color = match category {
            TimeCategory::Today => "#22c55e",
            TimeCategory::Weekend => "#f59e0b",
            TimeCategory::Future => "#9ca3af",
        };
        Self { color, category }
    }
}

/// A live map instance. Only the controller task touches it.
pub trait MapSurface: Send + 'static {
    type Marker: Send + 'static;

    /// Current viewport, `None` before the first layout.
    fn bounds(&self) -> Option<RawBounds>;

    fn add_marker(&mut self, pin: &EventPin, style: &MarkerStyle) -> Self::Marker;

    fn remove_marker(&mut self, marker: Self::Marker);

    /// Tear down the map instance.
    fn release(&mut self) {}
}

/// Where a map gets mounted, e.g. a DOM node or a window.
pub trait MapContainer {
    type Surface: MapSurface;

    fn mount(self, options: &MapOptions) -> Result<Self::Surface, MapError>;
}

//! Map viewport controller: keeps the rendered markers in line with the
//! events inside the current viewport and filters.

mod controller;
mod surface;

pub use controller::{
    MapConfig, MapHandle, MapSnapshot, MarkerSummary, PinSource, ViewStatus, initialize,
};
pub use surface::{MapContainer, MapError, MapOptions, MapSurface, MarkerStyle, RawBounds};

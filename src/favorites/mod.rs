//! Favorites on vendors, stars on events, and follows on series.
//!
//! All three are the same thing underneath: a (user, entity) membership
//! row. `db` owns the server side store, `toggle` the optimistic client
//! state.

pub mod db;
pub mod toggle;

pub use toggle::{FavoriteMutation, FavoriteToggle, ToggleError, ToggleState};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FavoriteKind {
    Vendor,
    Event,
    Series,
}

impl FavoriteKind {
    fn table(&self) -> &'static str {
        match self {
            FavoriteKind::Vendor => "vendor_favorite",
            FavoriteKind::Event => "event_star",
            FavoriteKind::Series => "series_follow",
        }
    }

    fn entity_column(&self) -> &'static str {
        match self {
            FavoriteKind::Vendor => "vendor_id",
            FavoriteKind::Event => "event_id",
            FavoriteKind::Series => "series_id",
        }
    }

    fn entity_table(&self) -> &'static str {
        match self {
            FavoriteKind::Vendor => "vendor",
            FavoriteKind::Event => "event",
            FavoriteKind::Series => "series",
        }
    }

    /// Name of the boolean in the mutation response body
    pub fn response_key(&self) -> &'static str {
        match self {
            FavoriteKind::Vendor => "favorited",
            FavoriteKind::Event => "starred",
            FavoriteKind::Series => "following",
        }
    }

    /// Mutation endpoint for an entity, relative to the server origin
    pub fn path(&self, entity_id: &str) -> String {
        let id = urlencoding::encode(entity_id);
        match self {
            FavoriteKind::Vendor => format!("/api/vendors/{}/favorite", id),
            FavoriteKind::Event => format!("/api/events/{}/star", id),
            FavoriteKind::Series => format!("/api/series/{}/follow", id),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FavoriteKind::Vendor => "Vendor",
            FavoriteKind::Event => "Event",
            FavoriteKind::Series => "Series",
        }
    }
}

//! Public types for the admin API
use serde::{Deserialize, Serialize};

/// Body of the create and update endpoints. Fields arrive as typed into
/// the admin form, so most are optional strings validated server side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
    pub address: Option<String>,
    pub image_url: Option<String>,
    pub is_market: Option<bool>,
    pub status: Option<String>,
    pub vendor_id: Option<String>,
    pub series_id: Option<String>,
    /// `"lat, lng"`, parentheses allowed
    pub coords: Option<String>,
    pub category_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedResponse {
    pub ok: bool,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

//! Public types for the vendors API
use serde::{Deserialize, Serialize};

use crate::api::public::map::EventPin;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub photo_url: Option<String>,
}

/// Vendor page: the vendor and its events that have not started yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorPage {
    #[serde(flatten)]
    pub vendor: Vendor,
    pub upcoming: Vec<EventPin>,
    pub is_favorite: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteResponse {
    pub favorited: bool,
}

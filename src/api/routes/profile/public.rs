//! Public types for the profile API
use serde::{Deserialize, Serialize};

use crate::api::public::events::SeriesSummary;
use crate::api::public::map::EventPin;
use crate::api::public::vendors::Vendor;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub is_admin: bool,
    /// Upcoming events soonest first, then past events most recent first
    pub starred_events: Vec<EventPin>,
    pub favorite_vendors: Vec<Vendor>,
    pub followed_series: Vec<SeriesSummary>,
}

//! Public types for the events API
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorSummary {
    pub id: String,
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDetail {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub address: Option<String>,
    pub image_url: Option<String>,
    pub is_market: bool,
    pub status: String,
    pub latitude: f64,
    pub longitude: f64,
    pub vendor: Option<VendorSummary>,
    pub series: Option<SeriesSummary>,
    pub categories: Vec<String>,
    #[serde(default)]
    pub is_starred: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarResponse {
    pub starred: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct IcsQuery {
    #[serde(rename = "reminderDays")]
    pub reminder_days: Option<u32>,
}

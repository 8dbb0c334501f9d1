//! Public types for the explore API
use serde::{Deserialize, Serialize};

pub use crate::explore::{ExploreCard, NextOccurrence};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ExploreQuery {
    pub search: Option<String>,
    pub category: Option<String>,
}

//! Client-side narrowing of the explore list by search text and category
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category option that disables category filtering
pub const ALL_CATEGORIES: &str = "All";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextOccurrence {
    pub event_id: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub address: Option<String>,
}

/// A vendor, or a standalone event with no vendor, as shown on the
/// explore page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExploreCard {
    pub id: String,
    /// Vendor page slug, `None` for standalone events
    pub slug: Option<String>,
    pub name: String,
    pub category: Option<String>,
    pub photo_url: Option<String>,
    pub is_event: bool,
    pub next: Option<NextOccurrence>,
    #[serde(default)]
    pub is_favorite: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExploreFilter {
    #[serde(default)]
    pub search: String,
    pub category: Option<String>,
}

impl ExploreFilter {
    pub fn matches(&self, card: &ExploreCard) -> bool {
        matches_search(card, &self.search) && matches_category(card, self.category.as_deref())
    }

    pub fn apply(&self, cards: &[ExploreCard]) -> Vec<ExploreCard> {
        filter_cards(cards, &self.search, self.category.as_deref())
    }
}

fn matches_search(card: &ExploreCard, search: &str) -> bool {
    let term = search.trim();
    term.is_empty() || card.name.to_lowercase().contains(&term.to_lowercase())
}

fn matches_category(card: &ExploreCard, category: Option<&str>) -> bool {
    match category.map(str::trim) {
        None | Some("") => true,
        Some(wanted) if wanted.eq_ignore_ascii_case(ALL_CATEGORIES) => true,
        Some(wanted) => card
            .category
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case(wanted)),
    }
}

/// Cards whose name contains `search` (ignoring case) and whose category
/// equals `category`. Order is preserved.
pub fn filter_cards(cards: &[ExploreCard], search: &str, category: Option<&str>) -> Vec<ExploreCard> {
    cards
        .iter()
        .filter(|card| matches_search(card, search) && matches_category(card, category))
        .cloned()
        .collect()
}

/// Sorted, de-duplicated categories present in `cards`, for the filter
/// dropdown. `ALL_CATEGORIES` comes first.
pub fn category_options(cards: &[ExploreCard]) -> Vec<String> {
    let mut categories: Vec<String> = cards.iter().filter_map(|c| c.category.clone()).collect();
    categories.sort_by_key(|c| c.to_lowercase());
    categories.dedup_by(|a, b| a.eq_ignore_ascii_case(b));
    let mut options = vec![ALL_CATEGORIES.to_string()];
    options.extend(categories);
    options
}

//! Database queries for the explore API
use anyhow::Result;
use chrono::Utc;
use tokio_rusqlite::Connection;

use super::public::{ExploreCard, NextOccurrence};
use crate::core::db::{optional_timestamp_column, timestamp_column, to_db_timestamp};

/// Vendors shown on the explore page
pub const MAX_VENDORS: usize = 100;
/// Standalone events shown on the explore page
pub const MAX_EVENTS: usize = 100;

fn vendor_card(row: &rusqlite::Row<'_>) -> rusqlite::Result<ExploreCard> {
    let next = match row.get::<_, Option<String>>(5)? {
        Some(event_id) => Some(NextOccurrence {
            event_id,
            starts_at: timestamp_column(row, 6)?,
            ends_at: optional_timestamp_column(row, 7)?,
            address: row.get(8)?,
        }),
        None => None,
    };
    Ok(ExploreCard {
        id: row.get(0)?,
        slug: row.get(1)?,
        name: row.get(2)?,
        category: row.get(3)?,
        photo_url: row.get(4)?,
        is_event: false,
        next,
        is_favorite: false,
    })
}

fn event_card(row: &rusqlite::Row<'_>) -> rusqlite::Result<ExploreCard> {
    let id: String = row.get(0)?;
    let is_market: bool = row.get(2)?;
    Ok(ExploreCard {
        next: Some(NextOccurrence {
            event_id: id.clone(),
            starts_at: timestamp_column(row, 4)?,
            ends_at: optional_timestamp_column(row, 5)?,
            address: row.get(6)?,
        }),
        id,
        slug: None,
        name: row.get(1)?,
        category: Some(if is_market { "Market" } else { "Event" }.to_string()),
        photo_url: row.get(3)?,
        is_event: true,
        is_favorite: false,
    })
}

/// Vendors by name, each with its next occurrence that has not ended,
/// followed by upcoming events that have no vendor.
pub async fn list_cards(db: &Connection) -> Result<Vec<ExploreCard>> {
    let now = to_db_timestamp(&Utc::now());
    let cards = db
        .call(move |conn| {
            let mut vendors = conn.prepare(
                r"
                SELECT v.id, v.slug, v.name, v.category, v.photo_url,
                       ne.id, ne.starts_at, ne.ends_at, ne.address
                FROM vendor v
                LEFT JOIN event ne ON ne.id = (
                    SELECT e.id FROM event e
                    WHERE e.vendor_id = v.id
                      AND e.status != 'cancelled'
                      AND COALESCE(e.ends_at, e.starts_at) >= ?1
                    ORDER BY e.starts_at ASC
                    LIMIT 1
                )
                ORDER BY v.name ASC
                LIMIT ?2
                ",
            )?;
            let mut cards = vendors
                .query_map(
                    rusqlite::params![&now, MAX_VENDORS as i64],
                    vendor_card,
                )?
                .collect::<Result<Vec<_>, _>>()?;

            let mut events = conn.prepare(
                r"
                SELECT id, title, is_market, image_url, starts_at, ends_at, address
                FROM event
                WHERE vendor_id IS NULL
                  AND status != 'cancelled'
                  AND COALESCE(ends_at, starts_at) >= ?1
                ORDER BY starts_at ASC
                LIMIT ?2
                ",
            )?;
            let standalone = events
                .query_map(rusqlite::params![&now, MAX_EVENTS as i64], event_card)?
                .collect::<Result<Vec<_>, _>>()?;
            cards.extend(standalone);
            Ok(cards)
        })
        .await?;
    Ok(cards)
}

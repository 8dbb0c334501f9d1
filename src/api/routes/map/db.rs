//! Database queries for the map API
use anyhow::Result;
use tokio_rusqlite::{Connection, params};

use super::public::{EventPin, SearchArea};
use crate::core::db::{optional_timestamp_column, timestamp_column, to_db_timestamp};
use crate::geo::Bounds;
use crate::time_window::TimeWindow;

/// Upper bound on pins returned for one viewport
pub const MAX_PINS: usize = 500;

/// Columns selected by every query that maps rows with `pin_from_row`.
/// Expects `event` aliased as `e` and a left join of `vendor` as `v`.
pub const PIN_COLUMNS: &str = r"
    e.id, e.title, e.description, e.starts_at, e.ends_at, e.address,
    e.latitude, e.longitude, v.id, v.name, v.slug
";

pub fn pin_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventPin> {
    Ok(EventPin {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        starts_at: timestamp_column(row, 3)?,
        ends_at: optional_timestamp_column(row, 4)?,
        address: row.get(5)?,
        latitude: row.get(6)?,
        longitude: row.get(7)?,
        vendor_id: row.get(8)?,
        vendor_name: row.get(9)?,
        vendor_slug: row.get(10)?,
    })
}

/// Events inside `area` that overlap `window`, earliest first. `None`
/// returns every match.
pub async fn search_pins(
    db: &Connection,
    area: Bounds,
    window: &TimeWindow,
    limit: Option<usize>,
) -> Result<Vec<EventPin>> {
    let start = to_db_timestamp(&window.start);
    let end = to_db_timestamp(&window.end);
    // SQLite treats a negative limit as no limit
    let limit = limit.map_or(-1, |n| n as i64);
    let pins = db
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                r"
                SELECT {PIN_COLUMNS}
                FROM event e
                LEFT JOIN vendor v ON v.id = e.vendor_id
                WHERE e.status != 'cancelled'
                  AND e.longitude BETWEEN ?1 AND ?2
                  AND e.latitude BETWEEN ?3 AND ?4
                  AND e.starts_at <= ?5
                  AND COALESCE(e.ends_at, e.starts_at) >= ?6
                ORDER BY e.starts_at ASC
                LIMIT ?7
                "
            ))?;
            let rows = stmt
                .query_map(
                    params![
                        area.min_lng,
                        area.max_lng,
                        area.min_lat,
                        area.max_lat,
                        end,
                        start,
                        limit,
                    ],
                    pin_from_row,
                )?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await?;
    Ok(pins)
}

/// Pins inside `area`, radius included, that overlap `window`. The cap
/// applies after the radius so corners of the box can't crowd out pins
/// inside the circle.
pub async fn search(db: &Connection, area: &SearchArea, window: &TimeWindow) -> Result<Vec<EventPin>> {
    if area.circle.is_none() {
        return search_pins(db, area.bounds, window, Some(MAX_PINS)).await;
    }
    let pins = search_pins(db, area.bounds, window, None).await?;
    Ok(pins
        .into_iter()
        .filter(|pin| area.contains(pin))
        .take(MAX_PINS)
        .collect())
}

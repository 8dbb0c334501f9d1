//! Database queries for the vendors API
use anyhow::Result;
use chrono::Utc;
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use super::public::Vendor;
use crate::api::public::map::EventPin;
use crate::api::routes::map::db::{PIN_COLUMNS, pin_from_row};
use crate::core::db::to_db_timestamp;

pub fn vendor_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Vendor> {
    Ok(Vendor {
        id: row.get(0)?,
        slug: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        category: row.get(4)?,
        photo_url: row.get(5)?,
    })
}

/// Look a vendor up by slug, falling back to id.
pub async fn get_vendor(db: &Connection, slug_or_id: &str) -> Result<Option<Vendor>> {
    let key = slug_or_id.to_owned();
    let vendor = db
        .call(move |conn| {
            let vendor = conn
                .query_row(
                    r"
                    SELECT id, slug, name, description, category, photo_url
                    FROM vendor
                    WHERE slug = ?1 OR id = ?1
                    ORDER BY slug = ?1 DESC
                    LIMIT 1
                    ",
                    [&key],
                    vendor_from_row,
                )
                .optional()?;
            Ok(vendor)
        })
        .await?;
    Ok(vendor)
}

/// Events of a vendor that start after now, soonest first.
pub async fn upcoming_events(db: &Connection, vendor_id: &str) -> Result<Vec<EventPin>> {
    let vendor_id = vendor_id.to_owned();
    let now = to_db_timestamp(&Utc::now());
    let events = db
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                r"
                SELECT {PIN_COLUMNS}
                FROM event e
                LEFT JOIN vendor v ON v.id = e.vendor_id
                WHERE e.vendor_id = ?1
                  AND e.starts_at > ?2
                  AND e.status != 'cancelled'
                ORDER BY e.starts_at ASC
                "
            ))?;
            let rows = stmt
                .query_map([&vendor_id, &now], pin_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await?;
    Ok(events)
}

//! Database queries for the admin API
use anyhow::Result;
use rusqlite::OptionalExtension;
use tokio_rusqlite::{Connection, params};

use crate::api::public::events::EventDetail;
use crate::api::routes::events::db::{DETAIL_COLUMNS, DETAIL_JOINS, categories_for, detail_from_row};
use crate::api::routes::profile::db::is_admin;
use crate::core::db::to_db_timestamp;
use crate::geo::Point;

/// Validated event fields ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub title: String,
    pub description: Option<String>,
    pub starts_at: chrono::DateTime<chrono::Utc>,
    pub ends_at: Option<chrono::DateTime<chrono::Utc>>,
    pub address: String,
    pub image_url: Option<String>,
    pub is_market: bool,
    pub status: String,
    pub vendor_id: Option<String>,
    pub series_id: Option<String>,
    /// `None` on update keeps the stored location
    pub location: Option<Point>,
    pub category_ids: Vec<i64>,
}

pub async fn user_is_admin(db: &Connection, user_id: &str) -> Result<bool> {
    let user_id = user_id.to_owned();
    let admin = db.call(move |conn| Ok(is_admin(conn, &user_id)?)).await?;
    Ok(admin)
}

/// Vendor location. `None` for an unknown vendor, `Some(None)` for a
/// vendor without coordinates.
pub async fn vendor_location(db: &Connection, vendor_id: &str) -> Result<Option<Option<Point>>> {
    let vendor_id = vendor_id.to_owned();
    let location = db
        .call(move |conn| {
            let row = conn
                .query_row(
                    "SELECT latitude, longitude FROM vendor WHERE id = ?1",
                    [&vendor_id],
                    |row| Ok((row.get::<_, Option<f64>>(0)?, row.get::<_, Option<f64>>(1)?)),
                )
                .optional()?;
            Ok(row.map(|coords| match coords {
                (Some(lat), Some(lng)) => Some(Point { lat, lng }),
                _ => None,
            }))
        })
        .await?;
    Ok(location)
}

pub async fn series_exists(db: &Connection, series_id: &str) -> Result<bool> {
    let series_id = series_id.to_owned();
    let exists = db
        .call(move |conn| {
            let found = conn
                .query_row("SELECT 1 FROM series WHERE id = ?1", [&series_id], |_| Ok(()))
                .optional()?;
            Ok(found.is_some())
        })
        .await?;
    Ok(exists)
}

/// First id in `category_ids` with no matching category, if any.
pub async fn unknown_category(db: &Connection, category_ids: &[i64]) -> Result<Option<i64>> {
    let category_ids = category_ids.to_vec();
    let unknown = db
        .call(move |conn| {
            let mut stmt = conn.prepare("SELECT 1 FROM category WHERE id = ?1")?;
            for id in category_ids {
                if !stmt.exists([id])? {
                    return Ok(Some(id));
                }
            }
            Ok(None)
        })
        .await?;
    Ok(unknown)
}

/// Every event, most recent start first.
pub async fn list_events(db: &Connection) -> Result<Vec<EventDetail>> {
    let events = db
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DETAIL_COLUMNS} {DETAIL_JOINS} ORDER BY e.starts_at DESC"
            ))?;
            let mut events = stmt
                .query_map([], detail_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            for event in events.iter_mut() {
                event.categories = categories_for(conn, &event.id)?;
            }
            Ok(events)
        })
        .await?;
    Ok(events)
}

fn replace_categories(
    tx: &rusqlite::Transaction<'_>,
    event_id: &str,
    category_ids: &[i64],
) -> rusqlite::Result<()> {
    tx.execute("DELETE FROM event_category WHERE event_id = ?1", [event_id])?;
    let mut stmt = tx.prepare(
        "INSERT OR IGNORE INTO event_category (event_id, category_id) VALUES (?1, ?2)",
    )?;
    for category_id in category_ids {
        stmt.execute(params![event_id, category_id])?;
    }
    Ok(())
}

/// Insert a new event. The record must carry a location.
pub async fn insert_event(db: &Connection, id: &str, record: EventRecord) -> Result<()> {
    let Some(location) = record.location else {
        anyhow::bail!("Event {} has no location", id);
    };
    let id = id.to_owned();
    db.call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
            r"
            INSERT INTO event (
                id, title, description, starts_at, ends_at, address, image_url,
                is_market, status, vendor_id, series_id, latitude, longitude
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            ",
            params![
                id,
                record.title,
                record.description,
                to_db_timestamp(&record.starts_at),
                record.ends_at.map(|dt| to_db_timestamp(&dt)),
                record.address,
                record.image_url,
                record.is_market,
                record.status,
                record.vendor_id,
                record.series_id,
                location.lat,
                location.lng,
            ],
        )?;
        replace_categories(&tx, &id, &record.category_ids)?;
        tx.commit()?;
        Ok(())
    })
    .await?;
    Ok(())
}

/// Update an event and replace its category links. Returns false when
/// the event does not exist.
pub async fn update_event(db: &Connection, id: &str, record: EventRecord) -> Result<bool> {
    let id = id.to_owned();
    let updated = db
        .call(move |conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                r"
                UPDATE event SET
                    title = ?2, description = ?3, starts_at = ?4, ends_at = ?5,
                    address = ?6, image_url = ?7, is_market = ?8, status = ?9,
                    vendor_id = ?10, series_id = ?11,
                    latitude = COALESCE(?12, latitude),
                    longitude = COALESCE(?13, longitude)
                WHERE id = ?1
                ",
                params![
                    id,
                    record.title,
                    record.description,
                    to_db_timestamp(&record.starts_at),
                    record.ends_at.map(|dt| to_db_timestamp(&dt)),
                    record.address,
                    record.image_url,
                    record.is_market,
                    record.status,
                    record.vendor_id,
                    record.series_id,
                    record.location.map(|p| p.lat),
                    record.location.map(|p| p.lng),
                ],
            )?;
            if changed == 0 {
                return Ok(false);
            }
            replace_categories(&tx, &id, &record.category_ids)?;
            tx.commit()?;
            Ok(true)
        })
        .await?;
    Ok(updated)
}

/// Returns false when the event does not exist.
pub async fn delete_event(db: &Connection, id: &str) -> Result<bool> {
    let id = id.to_owned();
    let deleted = db
        .call(move |conn| Ok(conn.execute("DELETE FROM event WHERE id = ?1", [&id])? > 0))
        .await?;
    Ok(deleted)
}

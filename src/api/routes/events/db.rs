//! Database queries for the events API
use anyhow::Result;
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use super::public::{EventDetail, SeriesSummary, VendorSummary};
use crate::calendar::CalendarEvent;
use crate::core::db::{optional_timestamp_column, timestamp_column};
use crate::geo::Point;

/// Columns read by `detail_from_row`. Expects `event` as `e`, and left
/// joins of `vendor` as `v` and `series` as `s`.
pub const DETAIL_COLUMNS: &str = r"
    e.id, e.title, e.description, e.starts_at, e.ends_at, e.address,
    e.image_url, e.is_market, e.status, e.latitude, e.longitude,
    v.id, v.slug, v.name, s.id, s.title
";

pub const DETAIL_JOINS: &str = r"
    FROM event e
    LEFT JOIN vendor v ON v.id = e.vendor_id
    LEFT JOIN series s ON s.id = e.series_id
";

/// Categories are loaded separately, see `categories_for`.
pub fn detail_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventDetail> {
    let vendor = match (
        row.get::<_, Option<String>>(11)?,
        row.get::<_, Option<String>>(12)?,
        row.get::<_, Option<String>>(13)?,
    ) {
        (Some(id), Some(slug), Some(name)) => Some(VendorSummary { id, slug, name }),
        _ => None,
    };
    let series = match (row.get::<_, Option<String>>(14)?, row.get::<_, Option<String>>(15)?) {
        (Some(id), Some(title)) => Some(SeriesSummary { id, title }),
        _ => None,
    };

    Ok(EventDetail {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        starts_at: timestamp_column(row, 3)?,
        ends_at: optional_timestamp_column(row, 4)?,
        address: row.get(5)?,
        image_url: row.get(6)?,
        is_market: row.get(7)?,
        status: row.get(8)?,
        latitude: row.get(9)?,
        longitude: row.get(10)?,
        vendor,
        series,
        categories: vec![],
        is_starred: false,
    })
}

pub fn categories_for(conn: &rusqlite::Connection, event_id: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        r"
        SELECT c.name FROM event_category ec
        JOIN category c ON c.id = ec.category_id
        WHERE ec.event_id = ?1
        ORDER BY c.name
        ",
    )?;
    stmt.query_map([event_id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()
}

pub fn find_event(conn: &rusqlite::Connection, id: &str) -> rusqlite::Result<Option<EventDetail>> {
    let event = conn
        .query_row(
            &format!("SELECT {DETAIL_COLUMNS} {DETAIL_JOINS} WHERE e.id = ?1"),
            [id],
            detail_from_row,
        )
        .optional()?;
    match event {
        Some(mut event) => {
            event.categories = categories_for(conn, &event.id)?;
            Ok(Some(event))
        }
        None => Ok(None),
    }
}

pub async fn get_event(db: &Connection, id: &str) -> Result<Option<EventDetail>> {
    let id = id.to_owned();
    let event = db.call(move |conn| Ok(find_event(conn, &id)?)).await?;
    Ok(event)
}

pub async fn get_calendar_event(db: &Connection, id: &str) -> Result<Option<CalendarEvent>> {
    let id = id.to_owned();
    let event = db
        .call(move |conn| {
            let event = conn
                .query_row(
                    r"
                    SELECT id, title, description, starts_at, ends_at, address,
                           latitude, longitude
                    FROM event WHERE id = ?1
                    ",
                    [&id],
                    |row| {
                        Ok(CalendarEvent {
                            id: row.get(0)?,
                            title: row.get(1)?,
                            description: row.get(2)?,
                            starts_at: timestamp_column(row, 3)?,
                            ends_at: optional_timestamp_column(row, 4)?,
                            address: row.get(5)?,
                            location: Some(Point {
                                lat: row.get(6)?,
                                lng: row.get(7)?,
                            }),
                        })
                    },
                )
                .optional()?;
            Ok(event)
        })
        .await?;
    Ok(event)
}

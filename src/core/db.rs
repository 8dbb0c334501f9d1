use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection as SyncConnection;
use tokio_rusqlite::Connection;

pub async fn async_db(db_path: &str) -> Result<Connection, tokio_rusqlite::Error> {
    let db = Connection::open(format!("{}/nearby.sqlite", db_path)).await?;
    db.call(|conn| {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(())
    })
    .await?;
    Ok(db)
}

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS vendor (
    id TEXT PRIMARY KEY,
    slug TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    description TEXT,
    category TEXT,
    photo_url TEXT,
    latitude REAL,
    longitude REAL
);

CREATE TABLE IF NOT EXISTS series (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS event (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    starts_at TEXT NOT NULL,
    ends_at TEXT,
    address TEXT,
    image_url TEXT,
    is_market INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'confirmed',
    vendor_id TEXT REFERENCES vendor(id) ON DELETE SET NULL,
    series_id TEXT REFERENCES series(id) ON DELETE SET NULL,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS event_location_idx ON event (longitude, latitude);
CREATE INDEX IF NOT EXISTS event_starts_at_idx ON event (starts_at);

CREATE TABLE IF NOT EXISTS category (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    slug TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS event_category (
    event_id TEXT NOT NULL REFERENCES event(id) ON DELETE CASCADE,
    category_id INTEGER NOT NULL REFERENCES category(id) ON DELETE CASCADE,
    PRIMARY KEY (event_id, category_id)
);

CREATE TABLE IF NOT EXISTS event_star (
    user_id TEXT NOT NULL,
    event_id TEXT NOT NULL REFERENCES event(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (user_id, event_id)
);

CREATE TABLE IF NOT EXISTS vendor_favorite (
    user_id TEXT NOT NULL,
    vendor_id TEXT NOT NULL REFERENCES vendor(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (user_id, vendor_id)
);

CREATE TABLE IF NOT EXISTS series_follow (
    user_id TEXT NOT NULL,
    series_id TEXT NOT NULL REFERENCES series(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (user_id, series_id)
);

CREATE TABLE IF NOT EXISTS app_admin (
    user_id TEXT PRIMARY KEY
);
";

pub fn initialize_db(conn: &SyncConnection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(&format!("BEGIN;\n{}\nCOMMIT;", SCHEMA))
}

/// Bring an existing database up to the current schema. Tables and
/// indices are created if missing; columns added after the first release
/// are added in place.
pub fn migrate_db(conn: &SyncConnection) -> Result<(), rusqlite::Error> {
    initialize_db(conn)?;

    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('event')")?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .filter_map(Result::ok)
        .collect::<Vec<_>>();

    for (column, ddl) in [
        ("image_url", "ALTER TABLE event ADD COLUMN image_url TEXT"),
        (
            "status",
            "ALTER TABLE event ADD COLUMN status TEXT NOT NULL DEFAULT 'confirmed'",
        ),
        (
            "series_id",
            "ALTER TABLE event ADD COLUMN series_id TEXT REFERENCES series(id)",
        ),
    ] {
        if !columns.iter().any(|c| c == column) {
            tracing::info!("Adding column event.{}", column);
            conn.execute(ddl, [])?;
        }
    }
    Ok(())
}

/// Timestamps are stored as UTC RFC 3339 with millisecond precision so
/// string comparison in SQL matches chronological order.
pub fn to_db_timestamp<Tz: chrono::TimeZone>(dt: &DateTime<Tz>) -> String {
    dt.with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn from_db_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc))
}

pub fn timestamp_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let value: String = row.get(idx)?;
    from_db_timestamp(&value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub fn optional_timestamp_column(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let value: Option<String> = row.get(idx)?;
    value
        .map(|v| {
            from_db_timestamp(&v).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_initializes_and_migrates_idempotently() {
        let conn = SyncConnection::open_in_memory().unwrap();
        initialize_db(&conn).unwrap();
        migrate_db(&conn).unwrap();
        migrate_db(&conn).unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'event'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn it_round_trips_timestamps_in_sortable_form() {
        let dt = DateTime::parse_from_rfc3339("2024-06-15T10:00:00-04:00").unwrap();
        let stored = to_db_timestamp(&dt);
        assert_eq!(stored, "2024-06-15T14:00:00.000Z");
        assert_eq!(from_db_timestamp(&stored).unwrap(), dt);
        assert!(to_db_timestamp(&dt) < "2024-06-15T14:00:00.001Z".to_string());
    }
}

//! Membership rows for favorites, stars, and follows
use std::collections::HashSet;

use anyhow::{Error, Result};
use chrono::Utc;
use tokio_rusqlite::Connection;

use super::FavoriteKind;
use crate::core::db::to_db_timestamp;

/// Flip membership. Returns the resulting state, or `None` when the
/// entity does not exist.
pub async fn toggle_membership(
    db: &Connection,
    kind: FavoriteKind,
    user_id: &str,
    entity_id: &str,
) -> Result<Option<bool>, Error> {
    write(db, kind, user_id, entity_id, None).await
}

/// Set membership to `on`. Idempotent.
pub async fn set_membership(
    db: &Connection,
    kind: FavoriteKind,
    user_id: &str,
    entity_id: &str,
    on: bool,
) -> Result<Option<bool>, Error> {
    write(db, kind, user_id, entity_id, Some(on)).await
}

async fn write(
    db: &Connection,
    kind: FavoriteKind,
    user_id: &str,
    entity_id: &str,
    desired: Option<bool>,
) -> Result<Option<bool>, Error> {
    let user_id = user_id.to_owned();
    let entity_id = entity_id.to_owned();
    let now = to_db_timestamp(&Utc::now());
    let result = db
        .call(move |conn| {
            // Read and write under one transaction so concurrent toggles
            // for the same row serialize
            let tx = conn.transaction()?;
            let result = write_membership(&tx, kind, &user_id, &entity_id, desired, &now)?;
            tx.commit()?;
            Ok(result)
        })
        .await?;
    Ok(result)
}

fn write_membership(
    conn: &rusqlite::Connection,
    kind: FavoriteKind,
    user_id: &str,
    entity_id: &str,
    desired: Option<bool>,
    now: &str,
) -> rusqlite::Result<Option<bool>> {
    let exists: bool = conn.query_row(
        &format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)",
            kind.entity_table()
        ),
        [entity_id],
        |row| row.get(0),
    )?;
    if !exists {
        return Ok(None);
    }

    let current: bool = conn.query_row(
        &format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE user_id = ?1 AND {} = ?2)",
            kind.table(),
            kind.entity_column()
        ),
        [user_id, entity_id],
        |row| row.get(0),
    )?;

    let next = desired.unwrap_or(!current);
    if next && !current {
        conn.execute(
            &format!(
                "INSERT OR IGNORE INTO {} (user_id, {}) VALUES (?1, ?2)",
                kind.table(),
                kind.entity_column()
            ),
            [user_id, entity_id],
        )?;
        if kind == FavoriteKind::Event {
            follow_current_series(conn, user_id, entity_id, now)?;
        }
    } else if !next && current {
        conn.execute(
            &format!(
                "DELETE FROM {} WHERE user_id = ?1 AND {} = ?2",
                kind.table(),
                kind.entity_column()
            ),
            [user_id, entity_id],
        )?;
    }

    tracing::debug!(
        "{} {} for {}: {} -> {}",
        kind.label(),
        entity_id,
        user_id,
        current,
        next
    );
    Ok(Some(next))
}

/// Starring an occurrence of a series that has not ended yet also
/// follows the series.
fn follow_current_series(
    conn: &rusqlite::Connection,
    user_id: &str,
    event_id: &str,
    now: &str,
) -> rusqlite::Result<()> {
    let followed = conn.execute(
        r"
        INSERT OR IGNORE INTO series_follow (user_id, series_id)
        SELECT ?1, e.series_id FROM event e
        WHERE e.id = ?2
          AND e.series_id IS NOT NULL
          AND COALESCE(e.ends_at, e.starts_at) >= ?3
        ",
        [user_id, event_id, now],
    )?;
    if followed > 0 {
        tracing::debug!("Auto-followed series of event {} for {}", event_id, user_id);
    }
    Ok(())
}

pub async fn is_member(
    db: &Connection,
    kind: FavoriteKind,
    user_id: &str,
    entity_id: &str,
) -> Result<bool, Error> {
    let user_id = user_id.to_owned();
    let entity_id = entity_id.to_owned();
    let result = db
        .call(move |conn| {
            let found: bool = conn.query_row(
                &format!(
                    "SELECT EXISTS(SELECT 1 FROM {} WHERE user_id = ?1 AND {} = ?2)",
                    kind.table(),
                    kind.entity_column()
                ),
                [&user_id, &entity_id],
                |row| row.get(0),
            )?;
            Ok(found)
        })
        .await?;
    Ok(result)
}

/// Ids of every entity of `kind` the user has saved.
pub async fn member_ids(
    db: &Connection,
    kind: FavoriteKind,
    user_id: &str,
) -> Result<HashSet<String>, Error> {
    let user_id = user_id.to_owned();
    let ids = db
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM {} WHERE user_id = ?1",
                kind.entity_column(),
                kind.table()
            ))?;
            let ids = stmt
                .query_map([&user_id], |row| row.get::<_, String>(0))?
                .filter_map(Result::ok)
                .collect::<HashSet<_>>();
            Ok(ids)
        })
        .await?;
    Ok(ids)
}

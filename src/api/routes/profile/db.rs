//! Database queries for the profile API
use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio_rusqlite::Connection;

use super::public::Profile;
use crate::api::public::events::SeriesSummary;
use crate::api::routes::map::db::{PIN_COLUMNS, pin_from_row};
use crate::api::routes::vendors::db::vendor_from_row;

/// Cap on starred events listed
pub const MAX_STARRED: usize = 200;

pub fn is_admin(conn: &rusqlite::Connection, user_id: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM app_admin WHERE user_id = ?1)",
        [user_id],
        |row| row.get(0),
    )
}

pub async fn get_profile(db: &Connection, user_id: &str, now: DateTime<Utc>) -> Result<Profile> {
    let user_id = user_id.to_owned();
    let profile = db
        .call(move |conn| {
            let is_admin = is_admin(conn, &user_id)?;

            let mut stmt = conn.prepare(&format!(
                r"
                SELECT {PIN_COLUMNS}
                FROM event_star st
                JOIN event e ON e.id = st.event_id
                LEFT JOIN vendor v ON v.id = e.vendor_id
                WHERE st.user_id = ?1
                ORDER BY e.starts_at ASC
                LIMIT ?2
                "
            ))?;
            let starred = stmt
                .query_map(
                    rusqlite::params![&user_id, MAX_STARRED as i64],
                    pin_from_row,
                )?
                .collect::<Result<Vec<_>, _>>()?;
            let (upcoming, mut past): (Vec<_>, Vec<_>) =
                starred.into_iter().partition(|e| e.starts_at > now);
            past.reverse();
            let starred_events = upcoming.into_iter().chain(past).collect();

            let mut stmt = conn.prepare(
                r"
                SELECT v.id, v.slug, v.name, v.description, v.category, v.photo_url
                FROM vendor_favorite f
                JOIN vendor v ON v.id = f.vendor_id
                WHERE f.user_id = ?1
                ORDER BY v.name ASC
                ",
            )?;
            let favorite_vendors = stmt
                .query_map([&user_id], vendor_from_row)?
                .collect::<Result<Vec<_>, _>>()?;

            let mut stmt = conn.prepare(
                r"
                SELECT s.id, s.title
                FROM series_follow f
                JOIN series s ON s.id = f.series_id
                WHERE f.user_id = ?1
                ORDER BY s.title ASC
                ",
            )?;
            let followed_series = stmt
                .query_map([&user_id], |row| {
                    Ok(SeriesSummary {
                        id: row.get(0)?,
                        title: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(Profile {
                user_id,
                is_admin,
                starred_events,
                favorite_vendors,
                followed_series,
            })
        })
        .await?;
    Ok(profile)
}

//! Test utilities for integration tests
#![allow(dead_code)]

use std::sync::{Arc, RwLock};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Duration, Utc};
use serde_json::Value;
use tokio_rusqlite::{Connection, params};
use tower::util::ServiceExt;

use nearby::api::AppState;
use nearby::api::app;
use nearby::core::AppConfig;
use nearby::core::db::{initialize_db, to_db_timestamp};

pub const ADMIN: &str = "admin-user";
pub const PUBLIC_URL: &str = "https://nearby.test";

/// Charlotte
pub const CLT: (f64, f64) = (35.2271, -80.8431);
/// Raleigh, ~130 miles from Charlotte
pub const RDU: (f64, f64) = (35.7796, -78.6382);

/// Creates a test application router backed by a seeded in-memory db.
///
/// Seeded rows, relative to now:
/// - `jazz-now`: "Jazz Night" in Charlotte, running now, vendor
///   `blue-note`, series `s1`, category Music
/// - `market-later`: "Farmers Market" in Charlotte in 60 days, no vendor
/// - `old-show`: "Old Show" 30 days ago, vendor `blue-note`
/// - `raleigh-now`: "Raleigh Fest" in Raleigh, running now
/// - `cancelled-now`: cancelled, in Charlotte, running now
pub async fn test_app() -> (Router, Connection) {
    let db = Connection::open_in_memory()
        .await
        .expect("Failed to open in-memory db");
    db.call(|conn| {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        initialize_db(conn)?;
        seed(conn)?;
        Ok(())
    })
    .await
    .expect("Failed to seed db");

    let app_config = AppConfig {
        storage_path: String::from("./"),
        db_path: String::from("./db"),
        timezone: chrono_tz::America::New_York,
        public_url: String::from(PUBLIC_URL),
        default_reminder_days: 1,
    };
    let app_state = AppState::new(db.clone(), app_config);
    (app(Arc::new(RwLock::new(app_state))), db)
}

fn seed(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    let now = Utc::now();
    let ts = |offset: Duration| to_db_timestamp(&(now + offset));

    conn.execute_batch(&format!(
        r"
        INSERT INTO vendor (id, slug, name, description, category, latitude, longitude)
        VALUES ('v1', 'blue-note', 'Blue Note', 'Live jazz', 'Music', {lat}, {lng});
        INSERT INTO vendor (id, slug, name, category)
        VALUES ('v2', 'taco-truck', 'Taco Truck', 'Food');
        INSERT INTO series (id, title) VALUES ('s1', 'First Fridays');
        INSERT INTO series (id, title) VALUES ('s2', 'Past Series');
        INSERT INTO category (id, name, slug) VALUES (1, 'Music', 'music');
        INSERT INTO category (id, name, slug) VALUES (2, 'Outdoor', 'outdoor');
        INSERT INTO app_admin (user_id) VALUES ('{ADMIN}');
        ",
        lat = CLT.0,
        lng = CLT.1,
    ))?;

    let mut insert = conn.prepare(
        r"
        INSERT INTO event (id, title, description, starts_at, ends_at, address,
                           is_market, status, vendor_id, series_id, latitude, longitude)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        ",
    )?;
    insert.execute(params![
        "jazz-now",
        "Jazz Night",
        "Trio, then open jam",
        ts(-Duration::minutes(1)),
        ts(Duration::minutes(1)),
        "1 Main St, Charlotte",
        false,
        "confirmed",
        "v1",
        "s1",
        CLT.0,
        CLT.1,
    ])?;
    insert.execute(params![
        "market-later",
        "Farmers Market",
        None::<String>,
        ts(Duration::days(60)),
        ts(Duration::days(60) + Duration::hours(4)),
        "Uptown",
        true,
        "confirmed",
        None::<String>,
        None::<String>,
        CLT.0 + 0.01,
        CLT.1 + 0.01,
    ])?;
    insert.execute(params![
        "old-show",
        "Old Show",
        None::<String>,
        ts(-Duration::days(30)),
        None::<String>,
        "1 Main St, Charlotte",
        false,
        "confirmed",
        "v1",
        "s2",
        CLT.0,
        CLT.1,
    ])?;
    insert.execute(params![
        "raleigh-now",
        "Raleigh Fest",
        None::<String>,
        ts(-Duration::minutes(1)),
        ts(Duration::minutes(1)),
        "Raleigh",
        false,
        "confirmed",
        None::<String>,
        None::<String>,
        RDU.0,
        RDU.1,
    ])?;
    insert.execute(params![
        "cancelled-now",
        "Cancelled Gig",
        None::<String>,
        ts(-Duration::minutes(1)),
        ts(Duration::minutes(1)),
        "Charlotte",
        false,
        "cancelled",
        None::<String>,
        None::<String>,
        CLT.0,
        CLT.1,
    ])?;

    conn.execute(
        "INSERT INTO event_category (event_id, category_id) VALUES ('jazz-now', 1)",
        [],
    )?;
    Ok(())
}

pub async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8(bytes.to_vec()).expect("Body is not utf-8")
}

/// Send one request, optionally as `user`, with an optional JSON body.
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, String) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        request = request.header("x-user-id", user);
    }
    let request = match body {
        Some(json) => request
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_to_string(response.into_body()).await)
}

pub async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let (status, body) = send(app, method, uri, user, body).await;
    let json = serde_json::from_str(&body).unwrap_or(Value::String(body));
    (status, json)
}

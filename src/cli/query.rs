use anyhow::{Result, anyhow};
use chrono::Utc;
use serde_json::json;

use crate::api::public::map::MapSearchQuery;
use crate::api::routes::map::db as map_db;
use crate::core::AppConfig;
use crate::core::db::async_db;
use crate::time_window;

pub async fn run(params: MapSearchQuery, config: &AppConfig) -> Result<()> {
    let area = params
        .area()
        .map_err(|e| anyhow!("{}: pass --min-lng/--min-lat/--max-lng/--max-lat and/or --lat/--lng/--radius", e))?;
    let when = params.when.unwrap_or_default();
    let window = time_window::resolve(when, Utc::now(), config.timezone);

    let pins = match area {
        Some(area) => {
            let db = async_db(&config.db_path).await?;
            map_db::search(&db, &area, &window).await?
        }
        None => vec![],
    };

    println!(
        "{}",
        json!({
            "when": when,
            "start": window.start.to_rfc3339(),
            "end": window.end.to_rfc3339(),
            "results": pins,
        })
    );
    Ok(())
}

use anyhow::{Result, anyhow};
use chrono::Utc;

use crate::api::routes::events::db as events_db;
use crate::calendar::render_ics;
use crate::core::AppConfig;
use crate::core::db::async_db;

pub async fn run(id: &str, reminder_days: Option<u32>, config: &AppConfig) -> Result<()> {
    let db = async_db(&config.db_path).await?;
    let event = events_db::get_calendar_event(&db, id)
        .await?
        .ok_or_else(|| anyhow!("Event {} not found", id))?;
    let reminder_days = reminder_days.unwrap_or(config.default_reminder_days);
    print!("{}", render_ics(&event, &config.public_url, reminder_days, Utc::now()));
    Ok(())
}

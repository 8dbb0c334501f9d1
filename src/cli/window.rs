use anyhow::Result;
use chrono::Utc;
use serde_json::json;

use crate::core::AppConfig;
use crate::time_window::{self, TimeFilter};

pub fn run(when: TimeFilter, config: &AppConfig) -> Result<()> {
    let window = time_window::resolve(when, Utc::now(), config.timezone);
    println!(
        "{}",
        json!({
            "when": when,
            "timezone": config.timezone.name(),
            "start": window.start.to_rfc3339(),
            "end": window.end.to_rfc3339(),
        })
    );
    Ok(())
}

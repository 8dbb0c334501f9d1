use std::env;

use anyhow::{Context, Result};
use chrono_tz::Tz;

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::New_York;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub storage_path: String,
    pub db_path: String,
    /// The one timezone every date computation uses
    pub timezone: Tz,
    /// Origin used when building links back to the app, e.g. in ICS files
    pub public_url: String,
    pub default_reminder_days: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let host = "127.0.0.1";
        let port = "2222";
        let storage_path = env::var("NEARBY_STORAGE_PATH").unwrap_or("./".to_string());
        let db_path = format!("{}/db", storage_path);
        let timezone = match env::var("NEARBY_TIMEZONE") {
            Ok(name) => name
                .parse::<Tz>()
                .map_err(|e| anyhow::anyhow!("Invalid NEARBY_TIMEZONE {}: {}", name, e))?,
            Err(_) => DEFAULT_TIMEZONE,
        };
        let public_url =
            env::var("NEARBY_PUBLIC_URL").unwrap_or(format!("http://{}:{}", host, port));
        let default_reminder_days = match env::var("NEARBY_DEFAULT_REMINDER_DAYS") {
            Ok(days) => days
                .parse()
                .context("NEARBY_DEFAULT_REMINDER_DAYS must be a whole number")?,
            Err(_) => 1,
        };

        Ok(Self {
            storage_path,
            db_path,
            timezone,
            public_url,
            default_reminder_days,
        })
    }
}

use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod ics;
pub mod init;
pub mod migrate;
pub mod query;
pub mod serve;
pub mod window;

use crate::core::AppConfig;
use crate::time_window::TimeFilter;

#[derive(Subcommand)]
enum Command {
    /// Create the database and its schema
    Init {
        #[arg(long, action, default_value = "false")]
        db: bool,
    },
    /// Migrate the db schema
    Migrate {
        #[arg(long, action, default_value = "false")]
        db: bool,
    },
    /// Run the API server
    Serve {
        /// Set the server host address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Set the server port
        #[arg(long, default_value = "2222")]
        port: String,
    },
    /// Search events by bounding box and/or radius and print them as JSON
    Query {
        #[arg(long, allow_negative_numbers = true)]
        min_lng: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        min_lat: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        max_lng: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        max_lat: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        lat: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        lng: Option<f64>,
        /// Radius in miles around --lat/--lng
        #[arg(long)]
        radius: Option<f64>,
        #[arg(long, default_value = "today")]
        when: TimeFilter,
    },
    /// Print the date range a time filter resolves to right now
    Window {
        #[arg(long, default_value = "today")]
        when: TimeFilter,
    },
    /// Print the calendar file for an event
    Ics {
        #[arg(long)]
        id: String,
        #[arg(long)]
        reminder_days: Option<u32>,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();
    let config = AppConfig::from_env()?;

    // Handle each sub command
    match args.command {
        Some(Command::Init { db }) => {
            init::run(db, &config.db_path).await?;
        }
        Some(Command::Migrate { db }) => {
            migrate::run(db, &config.db_path).await?;
        }
        Some(Command::Serve { host, port }) => {
            serve::run(host, port, config).await?;
        }
        Some(Command::Query {
            min_lng,
            min_lat,
            max_lng,
            max_lat,
            lat,
            lng,
            radius,
            when,
        }) => {
            let params = crate::api::public::map::MapSearchQuery {
                min_lng,
                min_lat,
                max_lng,
                max_lat,
                lat,
                lng,
                radius,
                when: Some(when),
                tz: None,
            };
            query::run(params, &config).await?;
        }
        Some(Command::Window { when }) => {
            window::run(when, &config)?;
        }
        Some(Command::Ics { id, reminder_days }) => {
            ics::run(&id, reminder_days, &config).await?;
        }
        None => {}
    }

    Ok(())
}

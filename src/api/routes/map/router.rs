//! Router for the map API

use std::sync::{Arc, RwLock};

use axum::{Json, Router, extract::State, routing::get};
use axum_extra::extract::{Query, QueryRejection};
use chrono::Utc;
use chrono_tz::Tz;

use super::db as map_db;
use super::public::{EventPin, MapSearchQuery};
use crate::api::public::ApiError;
use crate::api::state::AppState;
use crate::time_window;

type SharedState = Arc<RwLock<AppState>>;

// Viewport search endpoint
async fn map_search(
    State(state): State<SharedState>,
    query: Result<Query<MapSearchQuery>, QueryRejection>,
) -> Result<Json<Vec<EventPin>>, ApiError> {
    let Query(params) = query.map_err(|rejection| ApiError::bad_request(rejection.to_string()))?;
    let (db, tz) = {
        let shared_state = state.read().expect("Unable to read share state");
        (shared_state.db.clone(), shared_state.config.timezone)
    };

    if let Some(requested) = &params.tz {
        let requested: Tz = requested
            .parse()
            .map_err(|_| ApiError::bad_request(format!("Unknown timezone {}", requested)))?;
        if requested != tz {
            tracing::warn!(
                "Client asked for timezone {} but windows are resolved in {}",
                requested,
                tz
            );
        }
    }

    let Some(area) = params
        .area()
        .map_err(|_| ApiError::bad_request("Invalid bbox"))?
    else {
        return Ok(Json(vec![]));
    };

    let when = params.when.unwrap_or_default();
    let window = time_window::resolve(when, Utc::now(), tz);
    let pins = map_db::search(&db, &area, &window).await?;

    tracing::debug!("Map search ({}) returned {} pins", when, pins.len());
    Ok(Json(pins))
}

/// Create the map router
pub fn router() -> Router<SharedState> {
    Router::new().route("/search", get(map_search))
}

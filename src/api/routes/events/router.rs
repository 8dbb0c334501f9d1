//! Router for the events API

use std::sync::{Arc, RwLock};

use axum::{
    Json, Router,
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::Query;
use chrono::Utc;
use http::header;

use super::db as events_db;
use super::public::{EventDetail, IcsQuery, StarResponse};
use crate::api::auth::{CurrentUser, MaybeUser};
use crate::api::public::ApiError;
use crate::api::state::AppState;
use crate::calendar::{ics_filename, render_ics};
use crate::favorites::{FavoriteKind, db as favorites_db};

type SharedState = Arc<RwLock<AppState>>;

const NOT_FOUND: &str = "Event not found";

// Event detail endpoint
async fn event_detail(
    State(state): State<SharedState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<String>,
) -> Result<Json<EventDetail>, ApiError> {
    let db = state.read().expect("Unable to read share state").db.clone();
    let mut event = events_db::get_event(&db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;
    if let Some(user) = user {
        event.is_starred = favorites_db::is_member(&db, FavoriteKind::Event, &user, &id).await?;
    }
    Ok(Json(event))
}

// Calendar file endpoint
async fn event_ics(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(params): Query<IcsQuery>,
) -> Result<Response, ApiError> {
    let (db, origin, default_reminder_days) = {
        let shared_state = state.read().expect("Unable to read share state");
        (
            shared_state.db.clone(),
            shared_state.config.public_url.clone(),
            shared_state.config.default_reminder_days,
        )
    };

    let Some(event) = events_db::get_calendar_event(&db, &id).await? else {
        tracing::warn!("ICS requested for unknown event {}", id);
        return Err(ApiError::not_found(NOT_FOUND));
    };

    let reminder_days = params.reminder_days.unwrap_or(default_reminder_days);
    let body = render_ics(&event, &origin, reminder_days, Utc::now());
    let disposition = format!("inline; filename=\"{}\"", ics_filename(&event.title));

    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

async fn write_star(
    state: SharedState,
    user: &str,
    id: &str,
    desired: Option<bool>,
) -> Result<Json<StarResponse>, ApiError> {
    let db = state.read().expect("Unable to read share state").db.clone();
    let starred = match desired {
        Some(on) => favorites_db::set_membership(&db, FavoriteKind::Event, user, id, on).await?,
        None => favorites_db::toggle_membership(&db, FavoriteKind::Event, user, id).await?,
    }
    .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;
    Ok(Json(StarResponse { starred }))
}

// Star toggle endpoint
async fn toggle_star(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<StarResponse>, ApiError> {
    write_star(state, &user, &id, None).await
}

async fn star(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<StarResponse>, ApiError> {
    write_star(state, &user, &id, Some(true)).await
}

async fn unstar(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<StarResponse>, ApiError> {
    write_star(state, &user, &id, Some(false)).await
}

/// Create the events router
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/{id}", get(event_detail))
        .route("/{id}/ics", get(event_ics))
        .route("/{id}/star", post(toggle_star).put(star).delete(unstar))
}

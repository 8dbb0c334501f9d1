//! Router for the admin API

use std::sync::{Arc, RwLock};

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use chrono_tz::Tz;
use tokio_rusqlite::Connection;

use super::db::{self as admin_db, EventRecord};
use super::public::{EventForm, OkResponse, SavedResponse};
use crate::api::auth::CurrentUser;
use crate::api::public::ApiError;
use crate::api::public::events::EventDetail;
use crate::api::state::AppState;
use crate::geo::parse_coords;
use crate::time_window::parse_local_datetime;

type SharedState = Arc<RwLock<AppState>>;

const MISSING_FIELDS: &str = "Missing required fields: title, starts_at, address";
const NO_LOCATION: &str =
    "An event must have a location, either from a vendor or manual coordinates.";

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

async fn require_admin(state: &SharedState, user: &str) -> Result<(Connection, Tz), ApiError> {
    let (db, tz) = {
        let shared_state = state.read().expect("Unable to read share state");
        (shared_state.db.clone(), shared_state.config.timezone)
    };
    if !admin_db::user_is_admin(&db, user).await? {
        tracing::warn!("Non-admin {} tried to use the admin API", user);
        return Err(ApiError::forbidden());
    }
    Ok((db, tz))
}

/// Validate a submitted form. Creating requires a location, updating
/// without coords or vendor keeps the stored one.
async fn build_record(
    db: &Connection,
    form: EventForm,
    tz: Tz,
    creating: bool,
) -> Result<EventRecord, ApiError> {
    let (Some(title), Some(starts_at), Some(address)) = (
        non_empty(form.title),
        non_empty(form.starts_at),
        non_empty(form.address),
    ) else {
        return Err(ApiError::bad_request(MISSING_FIELDS));
    };

    let starts_at = parse_local_datetime(&starts_at, tz)
        .ok_or_else(|| ApiError::bad_request(format!("Invalid starts_at: {}", starts_at)))?;
    let ends_at = match non_empty(form.ends_at) {
        Some(ends_at) => Some(
            parse_local_datetime(&ends_at, tz)
                .ok_or_else(|| ApiError::bad_request(format!("Invalid ends_at: {}", ends_at)))?,
        ),
        None => None,
    };
    if ends_at.is_some_and(|end| end < starts_at) {
        return Err(ApiError::bad_request("ends_at must not be before starts_at"));
    }

    let vendor_id = non_empty(form.vendor_id);
    let vendor_location = match &vendor_id {
        Some(vendor_id) => admin_db::vendor_location(db, vendor_id)
            .await?
            .ok_or_else(|| ApiError::bad_request(format!("Unknown vendor {}", vendor_id)))?,
        None => None,
    };
    let location = match vendor_location {
        Some(point) => Some(point),
        None => match non_empty(form.coords) {
            Some(coords) => {
                Some(parse_coords(&coords).map_err(|e| ApiError::bad_request(e.to_string()))?)
            }
            None if creating => return Err(ApiError::bad_request(NO_LOCATION)),
            None => None,
        },
    };

    let series_id = non_empty(form.series_id);
    if let Some(series_id) = &series_id {
        if !admin_db::series_exists(db, series_id).await? {
            return Err(ApiError::bad_request(format!("Unknown series {}", series_id)));
        }
    }
    let category_ids = form.category_ids.unwrap_or_default();
    if let Some(id) = admin_db::unknown_category(db, &category_ids).await? {
        return Err(ApiError::bad_request(format!("Unknown category {}", id)));
    }

    Ok(EventRecord {
        title,
        description: non_empty(form.description),
        starts_at,
        ends_at,
        address,
        image_url: non_empty(form.image_url),
        is_market: form.is_market.unwrap_or(false),
        status: non_empty(form.status).unwrap_or_else(|| "confirmed".to_string()),
        vendor_id,
        series_id,
        location,
        category_ids,
    })
}

async fn list_events(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<EventDetail>>, ApiError> {
    let (db, _) = require_admin(&state, &user).await?;
    let events = admin_db::list_events(&db).await?;
    Ok(Json(events))
}

async fn create_event(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Json(form): Json<EventForm>,
) -> Result<Json<SavedResponse>, ApiError> {
    let (db, tz) = require_admin(&state, &user).await?;
    let record = build_record(&db, form, tz, true).await?;
    let id = uuid::Uuid::new_v4().to_string();
    admin_db::insert_event(&db, &id, record).await?;
    tracing::info!("Admin {} created event {}", user, id);
    Ok(Json(SavedResponse { ok: true, id }))
}

async fn update_event(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(form): Json<EventForm>,
) -> Result<Json<SavedResponse>, ApiError> {
    let (db, tz) = require_admin(&state, &user).await?;
    let record = build_record(&db, form, tz, false).await?;
    if !admin_db::update_event(&db, &id, record).await? {
        return Err(ApiError::not_found("Event not found"));
    }
    tracing::info!("Admin {} updated event {}", user, id);
    Ok(Json(SavedResponse { ok: true, id }))
}

async fn delete_event(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiError> {
    let (db, _) = require_admin(&state, &user).await?;
    if !admin_db::delete_event(&db, &id).await? {
        return Err(ApiError::not_found("Event not found"));
    }
    tracing::info!("Admin {} deleted event {}", user, id);
    Ok(Json(OkResponse { ok: true }))
}

/// Create the admin router
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route("/events/{id}", post(update_event).delete(delete_event))
}

//! Router for the profile API

use std::sync::{Arc, RwLock};

use axum::{Json, Router, extract::State, routing::get};
use chrono::Utc;

use super::db as profile_db;
use super::public::Profile;
use crate::api::auth::CurrentUser;
use crate::api::public::ApiError;
use crate::api::state::AppState;

type SharedState = Arc<RwLock<AppState>>;

async fn profile(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Profile>, ApiError> {
    let db = state.read().expect("Unable to read share state").db.clone();
    let profile = profile_db::get_profile(&db, &user, Utc::now()).await?;
    Ok(Json(profile))
}

/// Create the profile router
pub fn router() -> Router<SharedState> {
    Router::new().route("/", get(profile))
}

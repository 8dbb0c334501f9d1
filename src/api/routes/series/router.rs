//! Router for the series API

use std::sync::{Arc, RwLock};

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};

use super::public::FollowResponse;
use crate::api::auth::CurrentUser;
use crate::api::public::ApiError;
use crate::api::state::AppState;
use crate::favorites::{FavoriteKind, db as favorites_db};

type SharedState = Arc<RwLock<AppState>>;

async fn write_follow(
    state: SharedState,
    user: &str,
    id: &str,
    desired: Option<bool>,
) -> Result<Json<FollowResponse>, ApiError> {
    let db = state.read().expect("Unable to read share state").db.clone();
    let following = match desired {
        Some(on) => favorites_db::set_membership(&db, FavoriteKind::Series, user, id, on).await?,
        None => favorites_db::toggle_membership(&db, FavoriteKind::Series, user, id).await?,
    }
    .ok_or_else(|| ApiError::not_found("Series not found"))?;
    Ok(Json(FollowResponse { following }))
}

// Follow toggle endpoint
async fn toggle_follow(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<FollowResponse>, ApiError> {
    write_follow(state, &user, &id, None).await
}

async fn follow(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<FollowResponse>, ApiError> {
    write_follow(state, &user, &id, Some(true)).await
}

async fn unfollow(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<FollowResponse>, ApiError> {
    write_follow(state, &user, &id, Some(false)).await
}

/// Create the series router
pub fn router() -> Router<SharedState> {
    Router::new().route(
        "/{id}/follow",
        post(toggle_follow).put(follow).delete(unfollow),
    )
}

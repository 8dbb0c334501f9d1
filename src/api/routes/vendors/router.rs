//! Router for the vendors API

use std::sync::{Arc, RwLock};

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};

use super::db as vendors_db;
use super::public::{FavoriteResponse, VendorPage};
use crate::api::auth::{CurrentUser, MaybeUser};
use crate::api::public::ApiError;
use crate::api::state::AppState;
use crate::favorites::{FavoriteKind, db as favorites_db};

type SharedState = Arc<RwLock<AppState>>;

// Vendor page endpoint, accepts a slug or an id
async fn vendor_page(
    State(state): State<SharedState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<String>,
) -> Result<Json<VendorPage>, ApiError> {
    let db = state.read().expect("Unable to read share state").db.clone();
    let vendor = vendors_db::get_vendor(&db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Vendor not found"))?;
    let upcoming = vendors_db::upcoming_events(&db, &vendor.id).await?;
    let is_favorite = match user {
        Some(user) => favorites_db::is_member(&db, FavoriteKind::Vendor, &user, &vendor.id).await?,
        None => false,
    };
    Ok(Json(VendorPage {
        vendor,
        upcoming,
        is_favorite,
    }))
}

async fn write_favorite(
    state: SharedState,
    user: &str,
    id: &str,
    desired: Option<bool>,
) -> Result<Json<FavoriteResponse>, ApiError> {
    let db = state.read().expect("Unable to read share state").db.clone();
    let favorited = match desired {
        Some(on) => favorites_db::set_membership(&db, FavoriteKind::Vendor, user, id, on).await?,
        None => favorites_db::toggle_membership(&db, FavoriteKind::Vendor, user, id).await?,
    }
    .ok_or_else(|| ApiError::not_found("Vendor not found"))?;
    Ok(Json(FavoriteResponse { favorited }))
}

// Favorite toggle endpoint
async fn toggle_favorite(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<FavoriteResponse>, ApiError> {
    write_favorite(state, &user, &id, None).await
}

async fn favorite(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<FavoriteResponse>, ApiError> {
    write_favorite(state, &user, &id, Some(true)).await
}

async fn unfavorite(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<FavoriteResponse>, ApiError> {
    write_favorite(state, &user, &id, Some(false)).await
}

/// Create the vendors router
pub fn router() -> Router<SharedState> {
    Router::new().route("/{id}", get(vendor_page)).route(
        "/{id}/favorite",
        post(toggle_favorite).put(favorite).delete(unfavorite),
    )
}

//! API routes module

pub mod admin;
pub mod events;
pub mod explore;
pub mod map;
pub mod profile;
pub mod series;
pub mod vendors;

use std::sync::{Arc, RwLock};

use crate::api::state::AppState;
use axum::Router;

type SharedState = Arc<RwLock<AppState>>;

/// Create the combined API router
pub fn router() -> Router<SharedState> {
    Router::new()
        // Viewport search for the map
        .nest("/map", map::router())
        // Event detail, stars, and calendar export
        .nest("/events", events::router())
        // Series follows
        .nest("/series", series::router())
        // Vendor pages and favorites
        .nest("/vendors", vendors::router())
        // Explore listing
        .nest("/explore", explore::router())
        // The signed in user's saved things
        .nest("/profile", profile::router())
        // Event management
        .nest("/admin", admin::router())
}

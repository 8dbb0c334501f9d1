//! Router for the explore API

use std::sync::{Arc, RwLock};

use axum::{Json, Router, extract::State, routing::get};
use axum_extra::extract::Query;

use super::db as explore_db;
use super::public::{ExploreCard, ExploreQuery};
use crate::api::auth::MaybeUser;
use crate::api::public::ApiError;
use crate::api::state::AppState;
use crate::explore::filter_cards;
use crate::favorites::{FavoriteKind, db as favorites_db};

type SharedState = Arc<RwLock<AppState>>;

// Explore listing endpoint
async fn explore(
    State(state): State<SharedState>,
    MaybeUser(user): MaybeUser,
    Query(params): Query<ExploreQuery>,
) -> Result<Json<Vec<ExploreCard>>, ApiError> {
    let db = state.read().expect("Unable to read share state").db.clone();
    let mut cards = explore_db::list_cards(&db).await?;

    if let Some(user) = user {
        let vendors = favorites_db::member_ids(&db, FavoriteKind::Vendor, &user).await?;
        let events = favorites_db::member_ids(&db, FavoriteKind::Event, &user).await?;
        for card in cards.iter_mut() {
            card.is_favorite = if card.is_event {
                events.contains(&card.id)
            } else {
                vendors.contains(&card.id)
            };
        }
    }

    let cards = filter_cards(
        &cards,
        params.search.as_deref().unwrap_or_default(),
        params.category.as_deref(),
    );
    Ok(Json(cards))
}

/// Create the explore router
pub fn router() -> Router<SharedState> {
    Router::new().route("/", get(explore))
}

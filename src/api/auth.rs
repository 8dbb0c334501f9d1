//! Identity handed to us by the auth proxy in front of the server.
//!
//! The proxy authenticates the request and forwards the user id in the
//! `x-user-id` header. Nothing here verifies credentials.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use http::request::Parts;

use crate::api::public::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

fn user_id(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(String::from)
}

/// Rejects with 401 when no user is signed in.
pub struct CurrentUser(pub String);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        user_id(parts).map(CurrentUser).ok_or_else(ApiError::unauthorized)
    }
}

/// Signed in or anonymous, for routes that only personalize.
pub struct MaybeUser(pub Option<String>);

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(user_id(parts)))
    }
}

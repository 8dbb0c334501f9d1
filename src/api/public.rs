//! Public API types

use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::{Deserialize, Serialize};

// Errors

pub struct ApiError {
    status: StatusCode,
    error: anyhow::Error,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            error: anyhow::anyhow!(message.into()),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Please sign in")
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "Admin access required")
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

/// JSON body of every error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Convert `ApiError` into an Axum compatible response.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("{:#}", self.error);
        } else {
            tracing::debug!("{} {}", self.status, self.error);
        }

        let body = ErrorBody {
            error: self.error.to_string(),
        };
        (self.status, Json(body)).into_response()
    }
}

/// Enables using `?` on functions that return `Result<_,
/// anyhow::Error>` to turn them into `Result<_, ApiError>`
impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: err.into(),
        }
    }
}

// Re-export public types from each route

pub mod admin {
    pub use crate::api::routes::admin::public::*;
}

pub mod events {
    pub use crate::api::routes::events::public::*;
}

pub mod explore {
    pub use crate::api::routes::explore::public::*;
}

pub mod map {
    pub use crate::api::routes::map::public::*;
}

pub mod profile {
    pub use crate::api::routes::profile::public::*;
}

pub mod series {
    pub use crate::api::routes::series::public::*;
}

pub mod vendors {
    pub use crate::api::routes::vendors::public::*;
}

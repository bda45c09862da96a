//! API handlers for Biblioteca REST endpoints

pub mod authors;
pub mod books;
pub mod health;
pub mod loans;
pub mod openapi;
pub mod ratings;
pub mod sources;
pub mod users;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use serde::Serialize;

use crate::{
    error::AppError,
    services::{Notice, Sourced},
    session::DataSource,
    AppState,
};

/// Header carrying the opaque session id the per-session backend flag is
/// keyed on.
pub const SESSION_HEADER: &str = "x-session-id";

/// Extractor for the caller's session id.
///
/// Clients without the header share one `anonymous` session, which keeps
/// the relational default.
pub struct SessionId(pub String);

#[async_trait]
impl FromRequestParts<AppState> for SessionId {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        let session_id = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .unwrap_or("anonymous")
            .to_string();
        Ok(SessionId(session_id))
    }
}

/// Uniform response envelope: payload, the backend that served it, and
/// any user-visible notices (including the fallback warning).
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub data_source: DataSource,
    pub notices: Vec<Notice>,
}

impl<T: Serialize> From<Sourced<T>> for ApiResponse<T> {
    fn from(served: Sourced<T>) -> Self {
        Self {
            data: served.data,
            data_source: served.source,
            notices: served.notices,
        }
    }
}

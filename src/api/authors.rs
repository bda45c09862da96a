//! Author endpoints

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::AppResult,
    models::author::{Author, CreateAuthor},
};

use super::{ApiResponse, SessionId};

/// List all authors, sorted by name
#[utoipa::path(
    get,
    path = "/authors",
    tag = "authors",
    responses(
        (status = 200, description = "All authors")
    )
)]
pub async fn list_authors(
    State(state): State<crate::AppState>,
    SessionId(session_id): SessionId,
) -> AppResult<Json<ApiResponse<Vec<Author>>>> {
    let served = state.services.library.list_authors(&session_id).await?;
    Ok(Json(served.into()))
}

/// Create a new author
#[utoipa::path(
    post,
    path = "/authors",
    tag = "authors",
    request_body = CreateAuthor,
    responses(
        (status = 201, description = "Author created"),
        (status = 400, description = "Empty or overlong name")
    )
)]
pub async fn create_author(
    State(state): State<crate::AppState>,
    SessionId(session_id): SessionId,
    Json(input): Json<CreateAuthor>,
) -> AppResult<(StatusCode, Json<ApiResponse<Author>>)> {
    let served = state.services.library.create_author(&session_id, input).await?;
    Ok((StatusCode::CREATED, Json(served.into())))
}

//! Library user endpoints

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::AppResult,
    models::user::{CreateLibraryUser, LibraryUser},
};

use super::{ApiResponse, SessionId};

/// List all library users, sorted by name
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    responses(
        (status = 200, description = "All library users")
    )
)]
pub async fn list_users(
    State(state): State<crate::AppState>,
    SessionId(session_id): SessionId,
) -> AppResult<Json<ApiResponse<Vec<LibraryUser>>>> {
    let served = state.services.library.list_users(&session_id).await?;
    Ok(Json(served.into()))
}

/// Register a new library user
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = CreateLibraryUser,
    responses(
        (status = 201, description = "User created"),
        (status = 400, description = "Invalid name or email"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn create_user(
    State(state): State<crate::AppState>,
    SessionId(session_id): SessionId,
    Json(input): Json<CreateLibraryUser>,
) -> AppResult<(StatusCode, Json<ApiResponse<LibraryUser>>)> {
    let served = state.services.library.create_user(&session_id, input).await?;
    Ok((StatusCode::CREATED, Json(served.into())))
}

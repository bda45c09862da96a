//! Rating endpoints

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::AppResult,
    models::rating::{CreateRating, Rating},
};

use super::{ApiResponse, SessionId};

/// List all ratings, newest first
#[utoipa::path(
    get,
    path = "/ratings",
    tag = "ratings",
    responses(
        (status = 200, description = "All ratings")
    )
)]
pub async fn list_ratings(
    State(state): State<crate::AppState>,
    SessionId(session_id): SessionId,
) -> AppResult<Json<ApiResponse<Vec<Rating>>>> {
    let served = state.services.library.list_ratings(&session_id).await?;
    Ok(Json(served.into()))
}

/// Leave a rating (1-10)
#[utoipa::path(
    post,
    path = "/ratings",
    tag = "ratings",
    request_body = CreateRating,
    responses(
        (status = 201, description = "Rating created"),
        (status = 400, description = "Rating out of range or empty name")
    )
)]
pub async fn create_rating(
    State(state): State<crate::AppState>,
    SessionId(session_id): SessionId,
    Json(input): Json<CreateRating>,
) -> AppResult<(StatusCode, Json<ApiResponse<Rating>>)> {
    let served = state.services.library.create_rating(&session_id, input).await?;
    Ok((StatusCode::CREATED, Json(served.into())))
}

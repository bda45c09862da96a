//! Loan management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::loan::{CreateLoan, Loan, UserLoans},
};

use super::{ApiResponse, SessionId};

/// Register a loan for a book
#[utoipa::path(
    post,
    path = "/books/{id}/loans",
    tag = "loans",
    params(
        ("id" = String, Path, description = "Book ID")
    ),
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Loan registered"),
        (status = 400, description = "Malformed ID or end date before start date"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Book already has an active loan")
    )
)]
pub async fn create_loan(
    State(state): State<crate::AppState>,
    SessionId(session_id): SessionId,
    Path(book_id): Path<String>,
    Json(input): Json<CreateLoan>,
) -> AppResult<(StatusCode, Json<ApiResponse<Loan>>)> {
    let served = state
        .services
        .library
        .create_loan(&session_id, &book_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(served.into())))
}

/// Mark a loan returned; calling it again is a no-op success
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    params(
        ("id" = String, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan returned"),
        (status = 400, description = "Malformed loan ID"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    SessionId(session_id): SessionId,
    Path(loan_id): Path<String>,
) -> AppResult<Json<ApiResponse<Loan>>> {
    let served = state.services.library.return_loan(&session_id, &loan_id).await?;
    Ok(Json(served.into()))
}

/// Get a user's loans, newest first, with books and authors resolved
#[utoipa::path(
    get,
    path = "/users/{id}/loans",
    tag = "loans",
    params(
        ("id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "The user and their loans"),
        (status = 400, description = "Malformed user ID"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_loans(
    State(state): State<crate::AppState>,
    SessionId(session_id): SessionId,
    Path(user_id): Path<String>,
) -> AppResult<Json<ApiResponse<UserLoans>>> {
    let served = state
        .services
        .library
        .list_user_loans(&session_id, &user_id)
        .await?;
    Ok(Json(served.into()))
}

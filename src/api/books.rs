//! Book catalog endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::book::{Book, BookDetail, CreateBook, UpdateBook},
};

use super::{ApiResponse, SessionId};

/// List all books, sorted by title
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    responses(
        (status = 200, description = "All books with authors and loan status"),
        (status = 503, description = "No backend reachable")
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    SessionId(session_id): SessionId,
) -> AppResult<Json<ApiResponse<Vec<Book>>>> {
    let served = state.services.library.list_books(&session_id).await?;
    Ok(Json(served.into()))
}

/// Get a book with its active loan and loan history
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = String, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book detail"),
        (status = 400, description = "Malformed book ID"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    SessionId(session_id): SessionId,
    Path(book_id): Path<String>,
) -> AppResult<Json<ApiResponse<BookDetail>>> {
    let served = state
        .services
        .library
        .get_book_detail(&session_id, &book_id)
        .await?;
    Ok(Json(served.into()))
}

/// Create a new book
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created"),
        (status = 400, description = "Invalid title, year or author reference")
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    SessionId(session_id): SessionId,
    Json(input): Json<CreateBook>,
) -> AppResult<(StatusCode, Json<ApiResponse<Book>>)> {
    let served = state.services.library.create_book(&session_id, input).await?;
    Ok((StatusCode::CREATED, Json(served.into())))
}

/// Update a book; absent fields keep their current value
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = String, Path, description = "Book ID")
    ),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated"),
        (status = 400, description = "Malformed ID or invalid fields"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    SessionId(session_id): SessionId,
    Path(book_id): Path<String>,
    Json(input): Json<UpdateBook>,
) -> AppResult<Json<ApiResponse<Book>>> {
    let served = state
        .services
        .library
        .update_book(&session_id, &book_id, input)
        .await?;
    Ok(Json(served.into()))
}

//! Book model and related types

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::author::Author;
use super::loan::Loan;

/// Book as served by either backend.
///
/// `year` is optional on the way out because legacy documents may lack it;
/// creation always requires it. `is_loaned` is derived: true iff the book
/// has at least one loan with `returned == false`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub year: Option<i32>,
    pub author: Author,
    pub is_loaned: bool,
}

/// Book with its active loan and full loan history, newest first
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookDetail {
    pub book: Book,
    pub active_loan: Option<Loan>,
    pub loan_history: Vec<Loan>,
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 200, message = "El título es obligatorio (máx. 200 caracteres)"))]
    pub title: String,
    #[validate(range(min = 0, message = "El año no puede ser negativo"))]
    pub year: i32,
    /// Must reference an existing author
    pub author_id: String,
}

/// Update book request; absent fields keep their current value
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 200, message = "El título es obligatorio (máx. 200 caracteres)"))]
    pub title: Option<String>,
    #[validate(range(min = 0, message = "El año no puede ser negativo"))]
    pub year: Option<i32>,
    pub author_id: Option<String>,
}

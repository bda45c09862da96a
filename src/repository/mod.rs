//! Repository layer: one operation contract, two interchangeable backends.
//!
//! Both the relational (`sql`) and document (`mongo`) repositories satisfy
//! [`LibraryRepository`]; the façade picks one per request based on the
//! session's active data source and never inspects the concrete type.

pub mod mongo;
pub mod sql;

use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::{
        author::{Author, CreateAuthor},
        book::{Book, BookDetail, CreateBook, UpdateBook},
        loan::{CreateLoan, Loan, UserLoans},
        rating::{CreateRating, Rating},
        user::{CreateLibraryUser, LibraryUser},
    },
};

/// The backend-agnostic operation set.
///
/// Identity arguments are opaque string tokens; each implementation rejects
/// tokens it cannot interpret with `AppError::InvalidIdentity` before
/// issuing any query.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LibraryRepository: Send + Sync {
    // ----- books -----
    /// All books, sorted by title ascending, authors resolved.
    async fn list_books(&self) -> AppResult<Vec<Book>>;
    async fn get_book(&self, book_id: &str) -> AppResult<Book>;
    /// Book plus its active loan (if any) and full loan history, newest
    /// first, with users resolved.
    async fn get_book_detail(&self, book_id: &str) -> AppResult<BookDetail>;
    async fn create_book(&self, input: CreateBook) -> AppResult<Book>;
    async fn update_book(&self, book_id: &str, input: UpdateBook) -> AppResult<Book>;

    // ----- authors -----
    async fn list_authors(&self) -> AppResult<Vec<Author>>;
    async fn create_author(&self, input: CreateAuthor) -> AppResult<Author>;

    // ----- users -----
    async fn list_users(&self) -> AppResult<Vec<LibraryUser>>;
    async fn get_user(&self, user_id: &str) -> AppResult<LibraryUser>;
    async fn create_user(&self, input: CreateLibraryUser) -> AppResult<LibraryUser>;
    /// The user and all their loans, newest start date first, books and
    /// authors eagerly resolved.
    async fn list_user_loans(&self, user_id: &str) -> AppResult<UserLoans>;

    // ----- loans -----
    /// Registers a loan for a book. Re-checks the one-active-loan-per-book
    /// rule against current data immediately before inserting.
    async fn create_loan(&self, book_id: &str, input: CreateLoan) -> AppResult<Loan>;
    async fn get_loan(&self, loan_id: &str) -> AppResult<Loan>;
    /// Marks a loan returned. Idempotent: an already-returned loan is a
    /// no-op success.
    async fn return_loan(&self, loan_id: &str) -> AppResult<Loan>;

    // ----- ratings -----
    /// All ratings, newest first.
    async fn list_ratings(&self) -> AppResult<Vec<Rating>>;
    async fn create_rating(&self, input: CreateRating) -> AppResult<Rating>;
}

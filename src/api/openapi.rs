//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{authors, books, health, loans, ratings, sources, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Biblioteca API",
        version = "0.3.0",
        description = "Library management REST API with interchangeable SQL and MongoDB backends",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        // Loans
        loans::create_loan,
        loans::return_loan,
        loans::get_user_loans,
        // Authors
        authors::list_authors,
        authors::create_author,
        // Users
        users::list_users,
        users::create_user,
        // Ratings
        ratings::list_ratings,
        ratings::create_rating,
        // Data sources
        sources::get_data_source,
        sources::switch_data_source,
    ),
    components(
        schemas(
            // Books
            crate::models::book::Book,
            crate::models::book::BookDetail,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            // Authors
            crate::models::author::Author,
            crate::models::author::CreateAuthor,
            // Users
            crate::models::user::LibraryUser,
            crate::models::user::CreateLibraryUser,
            // Loans
            crate::models::loan::Loan,
            crate::models::loan::UserLoans,
            crate::models::loan::CreateLoan,
            // Ratings
            crate::models::rating::Rating,
            crate::models::rating::CreateRating,
            // Sources
            crate::session::DataSource,
            sources::DataSourceStatus,
            sources::SwitchSourceRequest,
            sources::SwitchSourceResponse,
            // Notices
            crate::services::Notice,
            crate::services::NoticeLevel,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Book catalog"),
        (name = "loans", description = "Loan management"),
        (name = "authors", description = "Author registry"),
        (name = "users", description = "Library users"),
        (name = "ratings", description = "Site ratings"),
        (name = "sources", description = "Per-session data source selection")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

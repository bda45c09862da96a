//! Library user model and related types

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Library user (borrower) as served by either backend
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LibraryUser {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// Create library user request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateLibraryUser {
    #[validate(length(min = 1, max = 100, message = "El nombre es obligatorio (máx. 100 caracteres)"))]
    pub name: String,
    /// Must be unique across users
    #[validate(email(message = "Formato de email no válido"))]
    pub email: String,
}

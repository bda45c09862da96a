//! Rating model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Rating as served by either backend. `created_at` is set once at
/// creation and never changes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Rating {
    pub id: String,
    pub name: String,
    pub comments: String,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
}

/// Create rating request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateRating {
    #[validate(length(min = 1, max = 100, message = "El nombre es obligatorio (máx. 100 caracteres)"))]
    pub name: String,
    pub comments: Option<String>,
    #[validate(range(min = 1, max = 10, message = "La calificación debe estar entre 1 y 10"))]
    pub rating: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rating_input(rating: i32) -> CreateRating {
        CreateRating {
            name: "Ana".to_string(),
            comments: None,
            rating,
        }
    }

    #[test]
    fn accepts_boundary_ratings() {
        assert!(rating_input(1).validate().is_ok());
        assert!(rating_input(10).validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_ratings() {
        assert!(rating_input(0).validate().is_err());
        assert!(rating_input(11).validate().is_err());
    }

    #[test]
    fn rejects_empty_name() {
        let input = CreateRating {
            name: String::new(),
            comments: Some("bien".to_string()),
            rating: 5,
        };
        assert!(input.validate().is_err());
    }
}

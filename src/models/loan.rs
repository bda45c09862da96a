//! Loan (borrow) model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use super::book::Book;
use super::user::LibraryUser;

/// Loan as served by either backend, with its user (and, where the caller
/// needs it, the book) eagerly resolved.
///
/// Dates are optional on the way out: legacy documents may carry malformed
/// date strings, which degrade to `None` instead of failing the read.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Loan {
    pub id: String,
    pub user: LibraryUser,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book: Option<Book>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub returned: bool,
}

/// A user together with all their loans, newest start date first
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserLoans {
    pub user: LibraryUser,
    pub loans: Vec<Loan>,
}

/// Create loan request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_loan_dates"))]
pub struct CreateLoan {
    /// Borrower; must reference an existing library user
    pub user_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

fn validate_loan_dates(loan: &CreateLoan) -> Result<(), ValidationError> {
    if loan.end_date < loan.start_date {
        let mut error = ValidationError::new("end_before_start");
        error.message = Some("La fecha de fin no puede ser anterior a la fecha de inicio.".into());
        return Err(error);
    }
    Ok(())
}

/// True iff any of the given loans is still out.
pub fn has_active_loan(loans: &[Loan]) -> bool {
    loans.iter().any(|loan| !loan.returned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loan_input(start: &str, end: &str) -> CreateLoan {
        CreateLoan {
            user_id: "1".to_string(),
            start_date: start.parse().unwrap(),
            end_date: end.parse().unwrap(),
        }
    }

    #[test]
    fn rejects_end_date_before_start_date() {
        assert!(loan_input("2024-01-15", "2024-01-01").validate().is_err());
    }

    #[test]
    fn accepts_equal_start_and_end_dates() {
        assert!(loan_input("2024-01-01", "2024-01-01").validate().is_ok());
    }

    #[test]
    fn accepts_ordered_dates() {
        assert!(loan_input("2024-01-01", "2024-01-15").validate().is_ok());
    }

    #[test]
    fn active_loan_detection() {
        let user = LibraryUser {
            id: "u1".to_string(),
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
        };
        let mut loans = vec![Loan {
            id: "l1".to_string(),
            user: user.clone(),
            book: None,
            start_date: None,
            end_date: None,
            returned: true,
        }];
        assert!(!has_active_loan(&loans));

        loans.push(Loan {
            id: "l2".to_string(),
            user,
            book: None,
            start_date: None,
            end_date: None,
            returned: false,
        });
        assert!(has_active_loan(&loans));
    }
}

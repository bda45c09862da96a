//! Relational repository backed by PostgreSQL.
//!
//! The schema carries the referential integrity (foreign keys, unique
//! email), so most operations are straight queries; the one rule the
//! schema cannot express — at most one unreturned loan per book — is
//! re-checked inside a transaction at write time.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, CreateAuthor},
        book::{Book, BookDetail, CreateBook, UpdateBook},
        loan::{CreateLoan, Loan, UserLoans},
        rating::{CreateRating, Rating},
        user::{CreateLibraryUser, LibraryUser},
    },
};

use super::LibraryRepository;

/// Parse an opaque identity token into a relational primary key.
///
/// Only plain decimal digit strings are accepted; anything else is an
/// `InvalidIdentity` raised before touching the database.
fn parse_pk(raw: &str) -> AppResult<i32> {
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::InvalidIdentity(format!(
            "'{}' no es un identificador válido",
            raw
        )));
    }
    raw.parse::<i32>()
        .map_err(|_| AppError::InvalidIdentity(format!("'{}' no es un identificador válido", raw)))
}

#[derive(Clone)]
pub struct SqlRepository {
    pool: Pool<Postgres>,
}

impl SqlRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn fetch_book(&self, book_pk: i32) -> AppResult<Book> {
        let row = sqlx::query(
            r#"
            SELECT b.id, b.title, b.year, a.id AS author_id, a.name AS author_name,
                   EXISTS(
                       SELECT 1 FROM loans l
                       WHERE l.book_id = b.id AND NOT l.returned
                   ) AS is_loaned
            FROM books b
            JOIN authors a ON b.author_id = a.id
            WHERE b.id = $1
            "#,
        )
        .bind(book_pk)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Libro no encontrado".to_string()))?;

        Ok(Book {
            id: row.get::<i32, _>("id").to_string(),
            title: row.get("title"),
            year: row.get::<Option<i32>, _>("year"),
            author: Author {
                id: row.get::<i32, _>("author_id").to_string(),
                name: row.get("author_name"),
            },
            is_loaned: row.get("is_loaned"),
        })
    }

    async fn fetch_user(&self, user_pk: i32) -> AppResult<LibraryUser> {
        let row = sqlx::query("SELECT id, name, email FROM library_users WHERE id = $1")
            .bind(user_pk)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Usuario no encontrado".to_string()))?;

        Ok(LibraryUser {
            id: row.get::<i32, _>("id").to_string(),
            name: row.get("name"),
            email: row.get("email"),
        })
    }
}

#[async_trait]
impl LibraryRepository for SqlRepository {
    async fn list_books(&self) -> AppResult<Vec<Book>> {
        let rows = sqlx::query(
            r#"
            SELECT b.id, b.title, b.year, a.id AS author_id, a.name AS author_name,
                   EXISTS(
                       SELECT 1 FROM loans l
                       WHERE l.book_id = b.id AND NOT l.returned
                   ) AS is_loaned
            FROM books b
            JOIN authors a ON b.author_id = a.id
            ORDER BY b.title
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Book {
                id: row.get::<i32, _>("id").to_string(),
                title: row.get("title"),
                year: row.get::<Option<i32>, _>("year"),
                author: Author {
                    id: row.get::<i32, _>("author_id").to_string(),
                    name: row.get("author_name"),
                },
                is_loaned: row.get("is_loaned"),
            })
            .collect())
    }

    async fn get_book(&self, book_id: &str) -> AppResult<Book> {
        self.fetch_book(parse_pk(book_id)?).await
    }

    async fn get_book_detail(&self, book_id: &str) -> AppResult<BookDetail> {
        let book_pk = parse_pk(book_id)?;
        let mut book = self.fetch_book(book_pk).await?;

        let rows = sqlx::query(
            r#"
            SELECT l.id, l.start_date, l.end_date, l.returned,
                   u.id AS user_id, u.name AS user_name, u.email AS user_email
            FROM loans l
            JOIN library_users u ON l.user_id = u.id
            WHERE l.book_id = $1
            ORDER BY l.start_date DESC, l.id DESC
            "#,
        )
        .bind(book_pk)
        .fetch_all(&self.pool)
        .await?;

        let loan_history: Vec<Loan> = rows
            .into_iter()
            .map(|row| Loan {
                id: row.get::<i32, _>("id").to_string(),
                user: LibraryUser {
                    id: row.get::<i32, _>("user_id").to_string(),
                    name: row.get("user_name"),
                    email: row.get("user_email"),
                },
                book: Some(book.clone()),
                start_date: row.get::<Option<NaiveDate>, _>("start_date"),
                end_date: row.get::<Option<NaiveDate>, _>("end_date"),
                returned: row.get("returned"),
            })
            .collect();

        let active_loan = loan_history.iter().find(|loan| !loan.returned).cloned();
        book.is_loaned = active_loan.is_some();

        Ok(BookDetail {
            book,
            active_loan,
            loan_history,
        })
    }

    async fn create_book(&self, input: CreateBook) -> AppResult<Book> {
        let author_pk = parse_pk(&input.author_id)?;
        let author_row = sqlx::query("SELECT id, name FROM authors WHERE id = $1")
            .bind(author_pk)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::Validation("El autor indicado no existe.".to_string()))?;

        let book_pk = sqlx::query_scalar::<_, i32>(
            "INSERT INTO books (title, year, author_id) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&input.title)
        .bind(input.year)
        .bind(author_pk)
        .fetch_one(&self.pool)
        .await?;

        Ok(Book {
            id: book_pk.to_string(),
            title: input.title,
            year: Some(input.year),
            author: Author {
                id: author_pk.to_string(),
                name: author_row.get("name"),
            },
            is_loaned: false,
        })
    }

    async fn update_book(&self, book_id: &str, input: UpdateBook) -> AppResult<Book> {
        let book_pk = parse_pk(book_id)?;
        let current = sqlx::query("SELECT title, year, author_id FROM books WHERE id = $1")
            .bind(book_pk)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Libro no encontrado".to_string()))?;

        let title = input.title.unwrap_or_else(|| current.get("title"));
        let year = match input.year {
            Some(year) => Some(year),
            None => current.get::<Option<i32>, _>("year"),
        };
        let author_pk = match input.author_id {
            Some(raw) => {
                let pk = parse_pk(&raw)?;
                sqlx::query_scalar::<_, i32>("SELECT id FROM authors WHERE id = $1")
                    .bind(pk)
                    .fetch_optional(&self.pool)
                    .await?
                    .ok_or_else(|| {
                        AppError::Validation("El autor indicado no existe.".to_string())
                    })?
            }
            None => current.get("author_id"),
        };

        sqlx::query("UPDATE books SET title = $1, year = $2, author_id = $3 WHERE id = $4")
            .bind(&title)
            .bind(year)
            .bind(author_pk)
            .bind(book_pk)
            .execute(&self.pool)
            .await?;

        self.fetch_book(book_pk).await
    }

    async fn list_authors(&self) -> AppResult<Vec<Author>> {
        let rows = sqlx::query("SELECT id, name FROM authors ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| Author {
                id: row.get::<i32, _>("id").to_string(),
                name: row.get("name"),
            })
            .collect())
    }

    async fn create_author(&self, input: CreateAuthor) -> AppResult<Author> {
        let author_pk =
            sqlx::query_scalar::<_, i32>("INSERT INTO authors (name) VALUES ($1) RETURNING id")
                .bind(&input.name)
                .fetch_one(&self.pool)
                .await?;

        Ok(Author {
            id: author_pk.to_string(),
            name: input.name,
        })
    }

    async fn list_users(&self) -> AppResult<Vec<LibraryUser>> {
        let rows = sqlx::query("SELECT id, name, email FROM library_users ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| LibraryUser {
                id: row.get::<i32, _>("id").to_string(),
                name: row.get("name"),
                email: row.get("email"),
            })
            .collect())
    }

    async fn get_user(&self, user_id: &str) -> AppResult<LibraryUser> {
        self.fetch_user(parse_pk(user_id)?).await
    }

    async fn create_user(&self, input: CreateLibraryUser) -> AppResult<LibraryUser> {
        let email_taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM library_users WHERE LOWER(email) = LOWER($1))",
        )
        .bind(&input.email)
        .fetch_one(&self.pool)
        .await?;

        if email_taken {
            return Err(AppError::Conflict("El email ya está registrado.".to_string()));
        }

        let user_pk = sqlx::query_scalar::<_, i32>(
            "INSERT INTO library_users (name, email) VALUES ($1, $2) RETURNING id",
        )
        .bind(&input.name)
        .bind(&input.email)
        .fetch_one(&self.pool)
        .await?;

        Ok(LibraryUser {
            id: user_pk.to_string(),
            name: input.name,
            email: input.email,
        })
    }

    async fn list_user_loans(&self, user_id: &str) -> AppResult<UserLoans> {
        let user_pk = parse_pk(user_id)?;
        let user = self.fetch_user(user_pk).await?;

        let rows = sqlx::query(
            r#"
            SELECT l.id, l.start_date, l.end_date, l.returned,
                   b.id AS book_id, b.title, b.year,
                   a.id AS author_id, a.name AS author_name,
                   EXISTS(
                       SELECT 1 FROM loans l2
                       WHERE l2.book_id = b.id AND NOT l2.returned
                   ) AS is_loaned
            FROM loans l
            JOIN books b ON l.book_id = b.id
            JOIN authors a ON b.author_id = a.id
            WHERE l.user_id = $1
            ORDER BY l.start_date DESC, l.id DESC
            "#,
        )
        .bind(user_pk)
        .fetch_all(&self.pool)
        .await?;

        let loans = rows
            .into_iter()
            .map(|row| Loan {
                id: row.get::<i32, _>("id").to_string(),
                user: user.clone(),
                book: Some(Book {
                    id: row.get::<i32, _>("book_id").to_string(),
                    title: row.get("title"),
                    year: Some(row.get::<i32, _>("year")),
                    author: Author {
                        id: row.get::<i32, _>("author_id").to_string(),
                        name: row.get("author_name"),
                    },
                    is_loaned: row.get("is_loaned"),
                }),
                start_date: row.get::<Option<NaiveDate>, _>("start_date"),
                end_date: row.get::<Option<NaiveDate>, _>("end_date"),
                returned: row.get("returned"),
            })
            .collect();

        Ok(UserLoans { user, loans })
    }

    async fn create_loan(&self, book_id: &str, input: CreateLoan) -> AppResult<Loan> {
        let book_pk = parse_pk(book_id)?;
        let user_pk = parse_pk(&input.user_id)?;

        if input.end_date < input.start_date {
            return Err(AppError::Validation(
                "La fecha de fin no puede ser anterior a la fecha de inicio.".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        // Lock the book row so concurrent loan creation for the same book
        // serializes on the exclusivity check below.
        sqlx::query("SELECT id FROM books WHERE id = $1 FOR UPDATE")
            .bind(book_pk)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Libro no encontrado".to_string()))?;

        let user_row = sqlx::query("SELECT id, name, email FROM library_users WHERE id = $1")
            .bind(user_pk)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::Validation("El usuario indicado no existe.".to_string()))?;

        let already_loaned: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM loans WHERE book_id = $1 AND NOT returned)",
        )
        .bind(book_pk)
        .fetch_one(&mut *tx)
        .await?;

        if already_loaned {
            return Err(AppError::Conflict("El libro ya está prestado.".to_string()));
        }

        let loan_pk = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO loans (book_id, user_id, start_date, end_date, returned)
            VALUES ($1, $2, $3, $4, FALSE)
            RETURNING id
            "#,
        )
        .bind(book_pk)
        .bind(user_pk)
        .bind(input.start_date)
        .bind(input.end_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let book = self.fetch_book(book_pk).await?;

        Ok(Loan {
            id: loan_pk.to_string(),
            user: LibraryUser {
                id: user_pk.to_string(),
                name: user_row.get("name"),
                email: user_row.get("email"),
            },
            book: Some(book),
            start_date: Some(input.start_date),
            end_date: Some(input.end_date),
            returned: false,
        })
    }

    async fn get_loan(&self, loan_id: &str) -> AppResult<Loan> {
        let loan_pk = parse_pk(loan_id)?;
        let row = sqlx::query(
            r#"
            SELECT l.id, l.book_id, l.start_date, l.end_date, l.returned,
                   u.id AS user_id, u.name AS user_name, u.email AS user_email
            FROM loans l
            JOIN library_users u ON l.user_id = u.id
            WHERE l.id = $1
            "#,
        )
        .bind(loan_pk)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Préstamo no encontrado".to_string()))?;

        let book = self.fetch_book(row.get::<i32, _>("book_id")).await?;

        Ok(Loan {
            id: row.get::<i32, _>("id").to_string(),
            user: LibraryUser {
                id: row.get::<i32, _>("user_id").to_string(),
                name: row.get("user_name"),
                email: row.get("user_email"),
            },
            book: Some(book),
            start_date: row.get::<Option<NaiveDate>, _>("start_date"),
            end_date: row.get::<Option<NaiveDate>, _>("end_date"),
            returned: row.get("returned"),
        })
    }

    async fn return_loan(&self, loan_id: &str) -> AppResult<Loan> {
        let loan = self.get_loan(loan_id).await?;
        if loan.returned {
            // Already returned: observable no-op success.
            return Ok(loan);
        }

        sqlx::query("UPDATE loans SET returned = TRUE WHERE id = $1")
            .bind(parse_pk(loan_id)?)
            .execute(&self.pool)
            .await?;

        self.get_loan(loan_id).await
    }

    async fn list_ratings(&self) -> AppResult<Vec<Rating>> {
        let rows = sqlx::query(
            "SELECT id, name, comments, rating, created_at FROM ratings ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Rating {
                id: row.get::<i32, _>("id").to_string(),
                name: row.get("name"),
                comments: row.get("comments"),
                rating: row.get("rating"),
                created_at: row.get::<DateTime<Utc>, _>("created_at"),
            })
            .collect())
    }

    async fn create_rating(&self, input: CreateRating) -> AppResult<Rating> {
        let comments = input.comments.unwrap_or_default();
        let row = sqlx::query(
            r#"
            INSERT INTO ratings (name, comments, rating)
            VALUES ($1, $2, $3)
            RETURNING id, created_at
            "#,
        )
        .bind(&input.name)
        .bind(&comments)
        .bind(input.rating)
        .fetch_one(&self.pool)
        .await?;

        Ok(Rating {
            id: row.get::<i32, _>("id").to_string(),
            name: input.name,
            comments,
            rating: input.rating,
            created_at: row.get::<DateTime<Utc>, _>("created_at"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pk_accepts_digit_strings() {
        assert_eq!(parse_pk("42").unwrap(), 42);
        assert_eq!(parse_pk("1").unwrap(), 1);
    }

    #[test]
    fn parse_pk_rejects_malformed_tokens() {
        for raw in ["", "abc", "-1", "1.5", "64f1b2a9c0ffee0123456789", " 7"] {
            assert!(matches!(
                parse_pk(raw),
                Err(AppError::InvalidIdentity(_))
            ));
        }
    }

    #[test]
    fn parse_pk_rejects_overflow() {
        assert!(matches!(
            parse_pk("99999999999999999999"),
            Err(AppError::InvalidIdentity(_))
        ));
    }
}

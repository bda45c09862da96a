//! Application façade: one entry point per use case, backend dispatch and
//! fallback.
//!
//! Every operation resolves the session's active data source, runs against
//! the matching repository and recovers exactly one error kind:
//! `BackendUnavailable` from the document backend flips the session to the
//! relational backend (persisting the downgrade for later requests),
//! attaches a warning notice, and re-executes the operation once against
//! SQL. The relational backend is the backend of last resort; its failures
//! are terminal. Within one request the document backend is never retried.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, CreateAuthor},
        book::{Book, BookDetail, CreateBook, UpdateBook},
        loan::{CreateLoan, Loan, UserLoans},
        rating::{CreateRating, Rating},
        user::{CreateLibraryUser, LibraryUser},
    },
    repository::LibraryRepository,
    session::{DataSource, SessionStore},
};

/// Severity of a user-visible notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A discrete, typed user-visible message attached to an operation's
/// outcome; the presentation layer decides how to display it.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}

/// An operation result together with the backend that actually served it
/// and the notices collected along the way.
#[derive(Debug, Clone, Serialize)]
pub struct Sourced<T> {
    pub data: T,
    pub source: DataSource,
    pub notices: Vec<Notice>,
}

#[derive(Clone)]
pub struct LibraryService {
    sql: Arc<dyn LibraryRepository>,
    mongo: Option<Arc<dyn LibraryRepository>>,
    sessions: SessionStore,
}

impl LibraryService {
    /// `mongo` is `None` when the document backend is disabled in the
    /// deployment configuration; sessions then always resolve to SQL.
    pub fn new(
        sql: Arc<dyn LibraryRepository>,
        mongo: Option<Arc<dyn LibraryRepository>>,
        sessions: SessionStore,
    ) -> Self {
        Self { sql, mongo, sessions }
    }

    /// Static capability probe: can this deployment serve from the
    /// document backend at all? Independent of server reachability.
    pub fn document_backend_available(&self) -> bool {
        self.mongo.is_some()
    }

    pub fn active_source(&self, session_id: &str) -> DataSource {
        self.sessions.active(session_id)
    }

    /// Change the session's active backend. Switching to Mongo is refused
    /// up front (no session mutation) when the document backend is not
    /// available in this deployment.
    pub fn switch_source(&self, session_id: &str, requested: DataSource) -> Sourced<DataSource> {
        if requested == DataSource::Mongo && !self.document_backend_available() {
            let current = self.sessions.active(session_id);
            return Sourced {
                data: current,
                source: current,
                notices: vec![Notice::error(
                    "MongoDB no está disponible. Habilita el backend de documentos en la configuración.",
                )],
            };
        }
        self.sessions.set_active(session_id, requested);
        tracing::info!(session = session_id, source = requested.as_str(), "data source switched");
        Sourced {
            data: requested,
            source: requested,
            notices: vec![Notice::info(format!(
                "Se cambió la fuente de datos a {}.",
                requested.label()
            ))],
        }
    }

    /// Run one repository operation against the session's active backend.
    ///
    /// Single-retry, one-directional, session-sticky: a `BackendUnavailable`
    /// from Mongo downgrades the session to SQL and re-executes `op` once
    /// there; any other error propagates unmodified.
    async fn dispatch<T, F>(&self, session_id: &str, op: F) -> AppResult<Sourced<T>>
    where
        F: for<'a> Fn(&'a dyn LibraryRepository) -> BoxFuture<'a, AppResult<T>>,
    {
        let mut notices = Vec::new();
        let mut source = self.sessions.active(session_id);

        if source == DataSource::Mongo {
            match &self.mongo {
                Some(mongo) => match op(mongo.as_ref()).await {
                    Ok(data) => return Ok(Sourced { data, source, notices }),
                    Err(AppError::BackendUnavailable(reason)) => {
                        source = self.fall_back_to_sql(session_id, &reason, &mut notices);
                    }
                    Err(other) => return Err(other),
                },
                None => {
                    source = self.fall_back_to_sql(
                        session_id,
                        "el backend de documentos no está habilitado",
                        &mut notices,
                    );
                }
            }
        }

        let data = op(self.sql.as_ref()).await?;
        Ok(Sourced { data, source, notices })
    }

    fn fall_back_to_sql(
        &self,
        session_id: &str,
        reason: &str,
        notices: &mut Vec<Notice>,
    ) -> DataSource {
        tracing::warn!(
            session = session_id,
            reason,
            "document backend unavailable, falling back to SQL"
        );
        notices.push(Notice::warning(format!(
            "No se pudo usar MongoDB: {}. Cambiamos automáticamente a SQL.",
            reason
        )));
        self.sessions.set_active(session_id, DataSource::Sql);
        DataSource::Sql
    }

    // ----- books -----

    pub async fn list_books(&self, session_id: &str) -> AppResult<Sourced<Vec<Book>>> {
        self.dispatch(session_id, |repo| repo.list_books()).await
    }

    pub async fn get_book_detail(
        &self,
        session_id: &str,
        book_id: &str,
    ) -> AppResult<Sourced<BookDetail>> {
        self.dispatch(session_id, |repo| {
            let book_id = book_id.to_string();
            Box::pin(async move { repo.get_book_detail(&book_id).await })
        })
        .await
    }

    pub async fn create_book(
        &self,
        session_id: &str,
        input: CreateBook,
    ) -> AppResult<Sourced<Book>> {
        input.validate()?;
        let mut served = self
            .dispatch(session_id, |repo| {
                let input = input.clone();
                Box::pin(async move { repo.create_book(input).await })
            })
            .await?;
        served.notices.push(Notice::success("Libro creado correctamente."));
        Ok(served)
    }

    pub async fn update_book(
        &self,
        session_id: &str,
        book_id: &str,
        input: UpdateBook,
    ) -> AppResult<Sourced<Book>> {
        input.validate()?;
        let mut served = self
            .dispatch(session_id, |repo| {
                let book_id = book_id.to_string();
                let input = input.clone();
                Box::pin(async move { repo.update_book(&book_id, input).await })
            })
            .await?;
        served.notices.push(Notice::success("Cambios guardados."));
        Ok(served)
    }

    // ----- authors -----

    pub async fn list_authors(&self, session_id: &str) -> AppResult<Sourced<Vec<Author>>> {
        self.dispatch(session_id, |repo| repo.list_authors()).await
    }

    pub async fn create_author(
        &self,
        session_id: &str,
        input: CreateAuthor,
    ) -> AppResult<Sourced<Author>> {
        input.validate()?;
        let mut served = self
            .dispatch(session_id, |repo| {
                let input = input.clone();
                Box::pin(async move { repo.create_author(input).await })
            })
            .await?;
        served.notices.push(Notice::success("Autor creado correctamente."));
        Ok(served)
    }

    // ----- users -----

    pub async fn list_users(&self, session_id: &str) -> AppResult<Sourced<Vec<LibraryUser>>> {
        self.dispatch(session_id, |repo| repo.list_users()).await
    }

    pub async fn create_user(
        &self,
        session_id: &str,
        input: CreateLibraryUser,
    ) -> AppResult<Sourced<LibraryUser>> {
        input.validate()?;
        let mut served = self
            .dispatch(session_id, |repo| {
                let input = input.clone();
                Box::pin(async move { repo.create_user(input).await })
            })
            .await?;
        served.notices.push(Notice::success("Usuario creado correctamente."));
        Ok(served)
    }

    pub async fn list_user_loans(
        &self,
        session_id: &str,
        user_id: &str,
    ) -> AppResult<Sourced<UserLoans>> {
        self.dispatch(session_id, |repo| {
            let user_id = user_id.to_string();
            Box::pin(async move { repo.list_user_loans(&user_id).await })
        })
        .await
    }

    // ----- loans -----

    pub async fn create_loan(
        &self,
        session_id: &str,
        book_id: &str,
        input: CreateLoan,
    ) -> AppResult<Sourced<Loan>> {
        input.validate()?;
        let mut served = self
            .dispatch(session_id, |repo| {
                let book_id = book_id.to_string();
                let input = input.clone();
                Box::pin(async move { repo.create_loan(&book_id, input).await })
            })
            .await?;
        served.notices.push(Notice::success("Préstamo registrado."));
        Ok(served)
    }

    pub async fn return_loan(&self, session_id: &str, loan_id: &str) -> AppResult<Sourced<Loan>> {
        let mut served = self
            .dispatch(session_id, |repo| {
                let loan_id = loan_id.to_string();
                Box::pin(async move { repo.return_loan(&loan_id).await })
            })
            .await?;
        served.notices.push(Notice::success("Préstamo marcado como devuelto."));
        Ok(served)
    }

    // ----- ratings -----

    pub async fn list_ratings(&self, session_id: &str) -> AppResult<Sourced<Vec<Rating>>> {
        self.dispatch(session_id, |repo| repo.list_ratings()).await
    }

    pub async fn create_rating(
        &self,
        session_id: &str,
        input: CreateRating,
    ) -> AppResult<Sourced<Rating>> {
        input.validate()?;
        let mut served = self
            .dispatch(session_id, |repo| {
                let input = input.clone();
                Box::pin(async move { repo.create_rating(input).await })
            })
            .await?;
        served
            .notices
            .push(Notice::success("Calificación registrada correctamente."));
        Ok(served)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::author::Author;
    use crate::repository::MockLibraryRepository;

    const SESSION: &str = "test-session";

    fn book(id: &str, title: &str) -> Book {
        Book {
            id: id.to_string(),
            title: title.to_string(),
            year: Some(1994),
            author: Author {
                id: "a1".to_string(),
                name: "Jane Doe".to_string(),
            },
            is_loaned: false,
        }
    }

    fn service(
        sql: MockLibraryRepository,
        mongo: Option<MockLibraryRepository>,
    ) -> (LibraryService, SessionStore) {
        let sessions = SessionStore::new();
        let service = LibraryService::new(
            Arc::new(sql),
            mongo.map(|m| Arc::new(m) as Arc<dyn LibraryRepository>),
            sessions.clone(),
        );
        (service, sessions)
    }

    #[tokio::test]
    async fn serves_sql_by_default() {
        let mut sql = MockLibraryRepository::new();
        sql.expect_list_books()
            .times(1)
            .returning(|| Ok(vec![book("1", "Rayuela")]));
        let mongo = MockLibraryRepository::new();

        let (service, _) = service(sql, Some(mongo));
        let served = service.list_books(SESSION).await.unwrap();

        assert_eq!(served.source, DataSource::Sql);
        assert_eq!(served.data[0].title, "Rayuela");
        assert!(served.notices.is_empty());
    }

    #[tokio::test]
    async fn serves_mongo_when_session_selects_it() {
        let sql = MockLibraryRepository::new();
        let mut mongo = MockLibraryRepository::new();
        mongo
            .expect_list_books()
            .times(1)
            .returning(|| Ok(vec![book("64f1b2a9c0ffee0123456789", "Ficciones")]));

        let (service, sessions) = service(sql, Some(mongo));
        sessions.set_active(SESSION, DataSource::Mongo);

        let served = service.list_books(SESSION).await.unwrap();
        assert_eq!(served.source, DataSource::Mongo);
        assert_eq!(served.data[0].title, "Ficciones");
    }

    #[tokio::test]
    async fn falls_back_once_and_downgrade_sticks() {
        let mut sql = MockLibraryRepository::new();
        sql.expect_list_books()
            .times(2)
            .returning(|| Ok(vec![book("1", "Rayuela")]));
        let mut mongo = MockLibraryRepository::new();
        mongo
            .expect_list_books()
            .times(1)
            .returning(|| Err(AppError::BackendUnavailable("connection refused".to_string())));

        let (service, sessions) = service(sql, Some(mongo));
        sessions.set_active(SESSION, DataSource::Mongo);

        // The in-flight call still succeeds, served from SQL, with a
        // warning attached.
        let served = service.list_books(SESSION).await.unwrap();
        assert_eq!(served.source, DataSource::Sql);
        assert_eq!(served.data[0].title, "Rayuela");
        assert_eq!(served.notices.len(), 1);
        assert_eq!(served.notices[0].level, NoticeLevel::Warning);
        assert!(served.notices[0].message.contains("MongoDB"));

        // The downgrade persisted: the next request goes straight to SQL
        // (the mongo mock would panic on a second call).
        assert_eq!(sessions.active(SESSION), DataSource::Sql);
        let served = service.list_books(SESSION).await.unwrap();
        assert_eq!(served.source, DataSource::Sql);
        assert!(served.notices.is_empty());
    }

    #[tokio::test]
    async fn domain_errors_do_not_trigger_fallback() {
        let sql = MockLibraryRepository::new();
        let mut mongo = MockLibraryRepository::new();
        mongo
            .expect_get_book_detail()
            .times(1)
            .returning(|_| Err(AppError::NotFound("Libro no encontrado".to_string())));

        let (service, sessions) = service(sql, Some(mongo));
        sessions.set_active(SESSION, DataSource::Mongo);

        let result = service.get_book_detail(SESSION, "64f1b2a9c0ffee0123456789").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        // The session keeps its chosen backend.
        assert_eq!(sessions.active(SESSION), DataSource::Mongo);
    }

    #[tokio::test]
    async fn disabled_document_backend_counts_as_unavailable() {
        let mut sql = MockLibraryRepository::new();
        sql.expect_list_books()
            .times(1)
            .returning(|| Ok(vec![]));

        let (service, sessions) = service(sql, None);
        sessions.set_active(SESSION, DataSource::Mongo);

        let served = service.list_books(SESSION).await.unwrap();
        assert_eq!(served.source, DataSource::Sql);
        assert_eq!(served.notices[0].level, NoticeLevel::Warning);
        assert_eq!(sessions.active(SESSION), DataSource::Sql);
    }

    #[tokio::test]
    async fn switch_to_mongo_refused_without_document_backend() {
        let (service, sessions) = service(MockLibraryRepository::new(), None);

        let served = service.switch_source(SESSION, DataSource::Mongo);
        assert_eq!(served.data, DataSource::Sql);
        assert_eq!(served.notices[0].level, NoticeLevel::Error);
        assert_eq!(sessions.active(SESSION), DataSource::Sql);
    }

    #[tokio::test]
    async fn switch_between_backends() {
        let (service, sessions) =
            service(MockLibraryRepository::new(), Some(MockLibraryRepository::new()));

        let served = service.switch_source(SESSION, DataSource::Mongo);
        assert_eq!(served.data, DataSource::Mongo);
        assert_eq!(sessions.active(SESSION), DataSource::Mongo);

        let served = service.switch_source(SESSION, DataSource::Sql);
        assert_eq!(served.data, DataSource::Sql);
        assert_eq!(sessions.active(SESSION), DataSource::Sql);
    }

    #[tokio::test]
    async fn create_loan_rejects_bad_dates_before_dispatch() {
        // No expectations: touching either repository would panic.
        let (service, _) = service(MockLibraryRepository::new(), Some(MockLibraryRepository::new()));

        let input = CreateLoan {
            user_id: "1".to_string(),
            start_date: "2024-01-15".parse().unwrap(),
            end_date: "2024-01-01".parse().unwrap(),
        };
        let result = service.create_loan(SESSION, "1", input).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn create_rating_enforces_bounds_before_dispatch() {
        let mut sql = MockLibraryRepository::new();
        sql.expect_create_rating().times(1).returning(|input| {
            Ok(Rating {
                id: "1".to_string(),
                name: input.name,
                comments: input.comments.unwrap_or_default(),
                rating: input.rating,
                created_at: chrono::Utc::now(),
            })
        });
        let (service, _) = service(sql, None);

        for rating in [0, 11] {
            let result = service
                .create_rating(
                    SESSION,
                    CreateRating {
                        name: "Ana".to_string(),
                        comments: None,
                        rating,
                    },
                )
                .await;
            assert!(matches!(result, Err(AppError::Validation(_))));
        }

        let served = service
            .create_rating(
                SESSION,
                CreateRating {
                    name: "Ana".to_string(),
                    comments: None,
                    rating: 10,
                },
            )
            .await
            .unwrap();
        assert_eq!(served.data.rating, 10);
    }
}

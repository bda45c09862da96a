//! Document repository backed by MongoDB.
//!
//! The document store has no foreign keys or joins, so reads assemble the
//! Book/Loan graph by hand: batch fetch-many-by-id-set helpers resolve
//! authors, users and books, and dangling references degrade to sentinel
//! placeholder records instead of failing the whole read.
//!
//! The client is a process-wide lazily initialized handle: the first
//! operation opens the connection with a short server-selection timeout
//! and probes it with a `ping`. Any connection or driver failure surfaces
//! as `AppError::BackendUnavailable`, the one error kind the façade
//! recognizes as a fallback trigger.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Bson, DateTime as BsonDateTime, Document},
    options::ClientOptions,
    Client, Database,
};
use tokio::sync::OnceCell;

use crate::{
    config::MongoConfig,
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

const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(3);

fn unavailable(e: mongodb::error::Error) -> AppError {
    AppError::BackendUnavailable(format!("No se pudo conectar a MongoDB ({})", e))
}

/// Parse an opaque identity token into an ObjectId, before any query is
/// issued.
fn object_id(raw: &str) -> AppResult<ObjectId> {
    ObjectId::parse_str(raw).map_err(|_| {
        AppError::InvalidIdentity(format!("'{}' no es un identificador válido", raw))
    })
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

fn date_string(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn safe_title(doc: &Document) -> String {
    match doc.get_str("title") {
        Ok(title) if !title.is_empty() => title.to_string(),
        _ => "Sin título".to_string(),
    }
}

fn doc_year(doc: &Document) -> Option<i32> {
    match doc.get("year") {
        Some(Bson::Int32(year)) => Some(*year),
        Some(Bson::Int64(year)) => i32::try_from(*year).ok(),
        _ => None,
    }
}

fn doc_created_at(doc: &Document) -> DateTime<Utc> {
    doc.get_datetime("created_at")
        .ok()
        .and_then(|dt| DateTime::from_timestamp_millis(dt.timestamp_millis()))
        .unwrap_or_else(Utc::now)
}

fn unknown_author() -> Author {
    Author {
        id: String::new(),
        name: "Autor desconocido".to_string(),
    }
}

fn unknown_user() -> LibraryUser {
    LibraryUser {
        id: String::new(),
        name: "Usuario desconocido".to_string(),
        email: String::new(),
    }
}

fn placeholder_book() -> Book {
    Book {
        id: String::new(),
        title: "Libro desconocido".to_string(),
        year: None,
        author: unknown_author(),
        is_loaned: false,
    }
}

pub struct MongoRepository {
    uri: String,
    db_name: String,
    client: OnceCell<Client>,
}

impl MongoRepository {
    pub fn new(config: &MongoConfig) -> Self {
        Self {
            uri: config.uri.clone(),
            db_name: config.database.clone(),
            client: OnceCell::new(),
        }
    }

    /// Lazily open the shared client, pinging once to fail fast when the
    /// server is unreachable. A failed attempt leaves the cell empty so
    /// the next request retries.
    async fn database(&self) -> AppResult<Database> {
        let client = self
            .client
            .get_or_try_init(|| async {
                let mut options =
                    ClientOptions::parse(&self.uri).await.map_err(unavailable)?;
                options.server_selection_timeout = Some(SERVER_SELECTION_TIMEOUT);
                let client = Client::with_options(options).map_err(unavailable)?;
                client
                    .database("admin")
                    .run_command(doc! { "ping": 1 })
                    .await
                    .map_err(unavailable)?;
                tracing::debug!("MongoDB connection established");
                Ok::<_, AppError>(client)
            })
            .await?;
        Ok(client.database(&self.db_name))
    }

    // ----- batch lookup helpers -----

    async fn authors_by_id(
        &self,
        db: &Database,
        ids: Vec<ObjectId>,
    ) -> AppResult<HashMap<String, Author>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut cursor = db
            .collection::<Document>("authors")
            .find(doc! { "_id": { "$in": ids } })
            .await
            .map_err(unavailable)?;
        let mut authors = HashMap::new();
        while let Some(doc) = cursor.try_next().await.map_err(unavailable)? {
            if let Ok(oid) = doc.get_object_id("_id") {
                authors.insert(
                    oid.to_hex(),
                    Author {
                        id: oid.to_hex(),
                        name: doc.get_str("name").unwrap_or("Autor").to_string(),
                    },
                );
            }
        }
        Ok(authors)
    }

    async fn users_by_id(
        &self,
        db: &Database,
        ids: Vec<ObjectId>,
    ) -> AppResult<HashMap<String, LibraryUser>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut cursor = db
            .collection::<Document>("library_users")
            .find(doc! { "_id": { "$in": ids } })
            .await
            .map_err(unavailable)?;
        let mut users = HashMap::new();
        while let Some(doc) = cursor.try_next().await.map_err(unavailable)? {
            if let Ok(oid) = doc.get_object_id("_id") {
                users.insert(
                    oid.to_hex(),
                    LibraryUser {
                        id: oid.to_hex(),
                        name: doc.get_str("name").unwrap_or("Usuario").to_string(),
                        email: doc.get_str("email").unwrap_or_default().to_string(),
                    },
                );
            }
        }
        Ok(users)
    }

    async fn books_by_id(
        &self,
        db: &Database,
        ids: Vec<ObjectId>,
    ) -> AppResult<HashMap<String, Book>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let docs: Vec<Document> = db
            .collection::<Document>("books")
            .find(doc! { "_id": { "$in": ids.clone() } })
            .await
            .map_err(unavailable)?
            .try_collect()
            .await
            .map_err(unavailable)?;

        let author_ids: Vec<ObjectId> = docs
            .iter()
            .filter_map(|doc| doc.get_object_id("author_id").ok())
            .collect();
        let authors = self.authors_by_id(db, author_ids).await?;

        // One query for the whole id set tells us which books are out.
        let mut active_books: HashSet<String> = HashSet::new();
        let mut cursor = db
            .collection::<Document>("loans")
            .find(doc! { "book_id": { "$in": ids }, "returned": false })
            .await
            .map_err(unavailable)?;
        while let Some(doc) = cursor.try_next().await.map_err(unavailable)? {
            if let Ok(oid) = doc.get_object_id("book_id") {
                active_books.insert(oid.to_hex());
            }
        }

        let mut books = HashMap::new();
        for doc in docs {
            let Ok(oid) = doc.get_object_id("_id") else {
                continue;
            };
            let book_id = oid.to_hex();
            let author = doc
                .get_object_id("author_id")
                .ok()
                .and_then(|aid| authors.get(&aid.to_hex()).cloned())
                .unwrap_or_else(unknown_author);
            books.insert(
                book_id.clone(),
                Book {
                    id: book_id.clone(),
                    title: safe_title(&doc),
                    year: doc_year(&doc),
                    author,
                    is_loaned: active_books.contains(&book_id),
                },
            );
        }
        Ok(books)
    }

    /// All loans for the given books, grouped by book id, users resolved.
    async fn loans_by_book(
        &self,
        db: &Database,
        book_ids: Vec<ObjectId>,
    ) -> AppResult<HashMap<String, Vec<Loan>>> {
        if book_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let docs: Vec<Document> = db
            .collection::<Document>("loans")
            .find(doc! { "book_id": { "$in": book_ids } })
            .await
            .map_err(unavailable)?
            .try_collect()
            .await
            .map_err(unavailable)?;

        let user_ids: Vec<ObjectId> = docs
            .iter()
            .filter_map(|doc| doc.get_object_id("user_id").ok())
            .collect();
        let users = self.users_by_id(db, user_ids).await?;

        let mut grouped: HashMap<String, Vec<Loan>> = HashMap::new();
        for doc in docs {
            let Ok(book_oid) = doc.get_object_id("book_id") else {
                continue;
            };
            grouped
                .entry(book_oid.to_hex())
                .or_default()
                .push(self.loan_from_doc(&doc, &users));
        }
        Ok(grouped)
    }

    fn loan_from_doc(&self, doc: &Document, users: &HashMap<String, LibraryUser>) -> Loan {
        let user = doc
            .get_object_id("user_id")
            .ok()
            .and_then(|uid| users.get(&uid.to_hex()).cloned())
            .unwrap_or_else(unknown_user);
        Loan {
            id: doc
                .get_object_id("_id")
                .map(|oid| oid.to_hex())
                .unwrap_or_default(),
            user,
            book: None,
            start_date: doc.get_str("start_date").ok().and_then(parse_date),
            end_date: doc.get_str("end_date").ok().and_then(parse_date),
            returned: doc.get_bool("returned").unwrap_or(false),
        }
    }

    async fn author_for(&self, db: &Database, doc: &Document) -> AppResult<Author> {
        let Some(author_oid) = doc.get_object_id("author_id").ok() else {
            return Ok(unknown_author());
        };
        let author_doc = db
            .collection::<Document>("authors")
            .find_one(doc! { "_id": author_oid })
            .await
            .map_err(unavailable)?;
        Ok(author_doc
            .map(|doc| Author {
                id: author_oid.to_hex(),
                name: doc.get_str("name").unwrap_or("Autor").to_string(),
            })
            .unwrap_or_else(unknown_author))
    }
}

#[async_trait]
impl LibraryRepository for MongoRepository {
    async fn list_books(&self) -> AppResult<Vec<Book>> {
        let db = self.database().await?;
        let docs: Vec<Document> = db
            .collection::<Document>("books")
            .find(doc! {})
            .sort(doc! { "title": 1 })
            .await
            .map_err(unavailable)?
            .try_collect()
            .await
            .map_err(unavailable)?;

        if docs.is_empty() {
            return Ok(Vec::new());
        }

        let author_ids: Vec<ObjectId> = docs
            .iter()
            .filter_map(|doc| doc.get_object_id("author_id").ok())
            .collect();
        let book_ids: Vec<ObjectId> = docs
            .iter()
            .filter_map(|doc| doc.get_object_id("_id").ok())
            .collect();

        let authors = self.authors_by_id(&db, author_ids).await?;
        let loans = self.loans_by_book(&db, book_ids).await?;

        let mut books = Vec::new();
        for doc in docs {
            let Ok(oid) = doc.get_object_id("_id") else {
                continue;
            };
            let book_id = oid.to_hex();
            let author = doc
                .get_object_id("author_id")
                .ok()
                .and_then(|aid| authors.get(&aid.to_hex()).cloned())
                .unwrap_or_else(unknown_author);
            let is_loaned = loans
                .get(&book_id)
                .map(|book_loans| book_loans.iter().any(|loan| !loan.returned))
                .unwrap_or(false);
            books.push(Book {
                id: book_id,
                title: safe_title(&doc),
                year: doc_year(&doc),
                author,
                is_loaned,
            });
        }
        Ok(books)
    }

    async fn get_book(&self, book_id: &str) -> AppResult<Book> {
        Ok(self.get_book_detail(book_id).await?.book)
    }

    async fn get_book_detail(&self, book_id: &str) -> AppResult<BookDetail> {
        let book_oid = object_id(book_id)?;
        let db = self.database().await?;

        let doc = db
            .collection::<Document>("books")
            .find_one(doc! { "_id": book_oid })
            .await
            .map_err(unavailable)?
            .ok_or_else(|| AppError::NotFound("Libro no encontrado".to_string()))?;

        let author = self.author_for(&db, &doc).await?;

        let loan_docs: Vec<Document> = db
            .collection::<Document>("loans")
            .find(doc! { "book_id": book_oid })
            .await
            .map_err(unavailable)?
            .try_collect()
            .await
            .map_err(unavailable)?;

        let user_ids: Vec<ObjectId> = loan_docs
            .iter()
            .filter_map(|doc| doc.get_object_id("user_id").ok())
            .collect();
        let users = self.users_by_id(&db, user_ids).await?;

        let mut book = Book {
            id: book_oid.to_hex(),
            title: safe_title(&doc),
            year: doc_year(&doc),
            author,
            is_loaned: false,
        };

        let mut loan_history: Vec<Loan> = loan_docs
            .iter()
            .map(|doc| {
                let mut loan = self.loan_from_doc(doc, &users);
                loan.book = Some(book.clone());
                loan
            })
            .collect();
        loan_history.sort_by(|a, b| b.start_date.cmp(&a.start_date));

        let active_loan = loan_history.iter().find(|loan| !loan.returned).cloned();
        book.is_loaned = active_loan.is_some();
        for loan in &mut loan_history {
            if let Some(loan_book) = &mut loan.book {
                loan_book.is_loaned = book.is_loaned;
            }
        }

        Ok(BookDetail {
            book,
            active_loan,
            loan_history,
        })
    }

    async fn create_book(&self, input: CreateBook) -> AppResult<Book> {
        let author_oid = object_id(&input.author_id)?;
        let db = self.database().await?;

        let author_doc = db
            .collection::<Document>("authors")
            .find_one(doc! { "_id": author_oid })
            .await
            .map_err(unavailable)?
            .ok_or_else(|| AppError::Validation("El autor indicado no existe.".to_string()))?;

        let payload = doc! {
            "title": &input.title,
            "year": input.year,
            "author_id": author_oid,
            "created_at": BsonDateTime::now(),
        };
        let result = db
            .collection::<Document>("books")
            .insert_one(payload)
            .await
            .map_err(unavailable)?;
        let book_oid = result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| AppError::Internal("insert did not return an ObjectId".to_string()))?;

        Ok(Book {
            id: book_oid.to_hex(),
            title: input.title,
            year: Some(input.year),
            author: Author {
                id: author_oid.to_hex(),
                name: author_doc.get_str("name").unwrap_or("Autor").to_string(),
            },
            is_loaned: false,
        })
    }

    async fn update_book(&self, book_id: &str, input: UpdateBook) -> AppResult<Book> {
        let book_oid = object_id(book_id)?;
        let db = self.database().await?;

        db.collection::<Document>("books")
            .find_one(doc! { "_id": book_oid })
            .await
            .map_err(unavailable)?
            .ok_or_else(|| AppError::NotFound("Libro no encontrado".to_string()))?;

        let mut updates = Document::new();
        if let Some(title) = &input.title {
            updates.insert("title", title);
        }
        if let Some(year) = input.year {
            updates.insert("year", year);
        }
        if let Some(raw_author) = &input.author_id {
            let author_oid = object_id(raw_author)?;
            db.collection::<Document>("authors")
                .find_one(doc! { "_id": author_oid })
                .await
                .map_err(unavailable)?
                .ok_or_else(|| {
                    AppError::Validation("El autor indicado no existe.".to_string())
                })?;
            updates.insert("author_id", author_oid);
        }

        if !updates.is_empty() {
            db.collection::<Document>("books")
                .update_one(doc! { "_id": book_oid }, doc! { "$set": updates })
                .await
                .map_err(unavailable)?;
        }

        self.get_book(book_id).await
    }

    async fn list_authors(&self) -> AppResult<Vec<Author>> {
        let db = self.database().await?;
        let mut cursor = db
            .collection::<Document>("authors")
            .find(doc! {})
            .sort(doc! { "name": 1 })
            .await
            .map_err(unavailable)?;

        let mut authors = Vec::new();
        while let Some(doc) = cursor.try_next().await.map_err(unavailable)? {
            if let Ok(oid) = doc.get_object_id("_id") {
                authors.push(Author {
                    id: oid.to_hex(),
                    name: doc.get_str("name").unwrap_or("Autor").to_string(),
                });
            }
        }
        Ok(authors)
    }

    async fn create_author(&self, input: CreateAuthor) -> AppResult<Author> {
        let db = self.database().await?;
        let result = db
            .collection::<Document>("authors")
            .insert_one(doc! { "name": &input.name })
            .await
            .map_err(unavailable)?;
        let author_oid = result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| AppError::Internal("insert did not return an ObjectId".to_string()))?;

        Ok(Author {
            id: author_oid.to_hex(),
            name: input.name,
        })
    }

    async fn list_users(&self) -> AppResult<Vec<LibraryUser>> {
        let db = self.database().await?;
        let mut cursor = db
            .collection::<Document>("library_users")
            .find(doc! {})
            .sort(doc! { "name": 1 })
            .await
            .map_err(unavailable)?;

        let mut users = Vec::new();
        while let Some(doc) = cursor.try_next().await.map_err(unavailable)? {
            if let Ok(oid) = doc.get_object_id("_id") {
                users.push(LibraryUser {
                    id: oid.to_hex(),
                    name: doc.get_str("name").unwrap_or("Usuario").to_string(),
                    email: doc.get_str("email").unwrap_or_default().to_string(),
                });
            }
        }
        Ok(users)
    }

    async fn get_user(&self, user_id: &str) -> AppResult<LibraryUser> {
        let user_oid = object_id(user_id)?;
        let db = self.database().await?;
        let doc = db
            .collection::<Document>("library_users")
            .find_one(doc! { "_id": user_oid })
            .await
            .map_err(unavailable)?
            .ok_or_else(|| AppError::NotFound("Usuario no encontrado".to_string()))?;

        Ok(LibraryUser {
            id: user_oid.to_hex(),
            name: doc.get_str("name").unwrap_or("Usuario").to_string(),
            email: doc.get_str("email").unwrap_or_default().to_string(),
        })
    }

    async fn create_user(&self, input: CreateLibraryUser) -> AppResult<LibraryUser> {
        let db = self.database().await?;
        let existing = db
            .collection::<Document>("library_users")
            .find_one(doc! { "email": &input.email })
            .await
            .map_err(unavailable)?;
        if existing.is_some() {
            return Err(AppError::Conflict("El email ya está registrado.".to_string()));
        }

        let result = db
            .collection::<Document>("library_users")
            .insert_one(doc! { "name": &input.name, "email": &input.email })
            .await
            .map_err(unavailable)?;
        let user_oid = result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| AppError::Internal("insert did not return an ObjectId".to_string()))?;

        Ok(LibraryUser {
            id: user_oid.to_hex(),
            name: input.name,
            email: input.email,
        })
    }

    async fn list_user_loans(&self, user_id: &str) -> AppResult<UserLoans> {
        let user = self.get_user(user_id).await?;
        let user_oid = object_id(user_id)?;
        let db = self.database().await?;

        let docs: Vec<Document> = db
            .collection::<Document>("loans")
            .find(doc! { "user_id": user_oid })
            .await
            .map_err(unavailable)?
            .try_collect()
            .await
            .map_err(unavailable)?;

        let book_ids: Vec<ObjectId> = docs
            .iter()
            .filter_map(|doc| doc.get_object_id("book_id").ok())
            .collect();
        let books = self.books_by_id(&db, book_ids).await?;

        let mut loans: Vec<Loan> = docs
            .iter()
            .map(|doc| {
                let book = doc
                    .get_object_id("book_id")
                    .ok()
                    .and_then(|bid| books.get(&bid.to_hex()).cloned())
                    .unwrap_or_else(placeholder_book);
                Loan {
                    id: doc
                        .get_object_id("_id")
                        .map(|oid| oid.to_hex())
                        .unwrap_or_default(),
                    user: user.clone(),
                    book: Some(book),
                    start_date: doc.get_str("start_date").ok().and_then(parse_date),
                    end_date: doc.get_str("end_date").ok().and_then(parse_date),
                    returned: doc.get_bool("returned").unwrap_or(false),
                }
            })
            .collect();
        loans.sort_by(|a, b| b.start_date.cmp(&a.start_date));

        Ok(UserLoans { user, loans })
    }

    async fn create_loan(&self, book_id: &str, input: CreateLoan) -> AppResult<Loan> {
        let book_oid = object_id(book_id)?;
        let user_oid = object_id(&input.user_id)?;

        if input.end_date < input.start_date {
            return Err(AppError::Validation(
                "La fecha de fin no puede ser anterior a la fecha de inicio.".to_string(),
            ));
        }

        let db = self.database().await?;

        db.collection::<Document>("books")
            .find_one(doc! { "_id": book_oid })
            .await
            .map_err(unavailable)?
            .ok_or_else(|| AppError::NotFound("Libro no encontrado".to_string()))?;

        // The store has no uniqueness constraint for "one active loan per
        // book", so re-check against current documents right before the
        // insert.
        let active = db
            .collection::<Document>("loans")
            .find_one(doc! { "book_id": book_oid, "returned": false })
            .await
            .map_err(unavailable)?;
        if active.is_some() {
            return Err(AppError::Conflict("El libro ya está prestado.".to_string()));
        }

        db.collection::<Document>("library_users")
            .find_one(doc! { "_id": user_oid })
            .await
            .map_err(unavailable)?
            .ok_or_else(|| AppError::Validation("El usuario indicado no existe.".to_string()))?;

        let payload = doc! {
            "book_id": book_oid,
            "user_id": user_oid,
            "start_date": date_string(input.start_date),
            "end_date": date_string(input.end_date),
            "returned": false,
        };
        let result = db
            .collection::<Document>("loans")
            .insert_one(payload)
            .await
            .map_err(unavailable)?;
        let loan_oid = result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| AppError::Internal("insert did not return an ObjectId".to_string()))?;

        self.get_loan(&loan_oid.to_hex()).await
    }

    async fn get_loan(&self, loan_id: &str) -> AppResult<Loan> {
        let loan_oid = object_id(loan_id)?;
        let db = self.database().await?;

        let doc = db
            .collection::<Document>("loans")
            .find_one(doc! { "_id": loan_oid })
            .await
            .map_err(unavailable)?
            .ok_or_else(|| AppError::NotFound("Préstamo no encontrado".to_string()))?;

        // Deleted user or book documents degrade to placeholders; the loan
        // itself stays readable.
        let user = match doc.get_object_id("user_id") {
            Ok(user_oid) => {
                let users = self.users_by_id(&db, vec![user_oid]).await?;
                users.get(&user_oid.to_hex()).cloned().unwrap_or_else(unknown_user)
            }
            Err(_) => unknown_user(),
        };
        let book = match doc.get_object_id("book_id") {
            Ok(book_oid) => {
                let books = self.books_by_id(&db, vec![book_oid]).await?;
                books
                    .get(&book_oid.to_hex())
                    .cloned()
                    .unwrap_or_else(placeholder_book)
            }
            Err(_) => placeholder_book(),
        };

        Ok(Loan {
            id: loan_oid.to_hex(),
            user,
            book: Some(book),
            start_date: doc.get_str("start_date").ok().and_then(parse_date),
            end_date: doc.get_str("end_date").ok().and_then(parse_date),
            returned: doc.get_bool("returned").unwrap_or(false),
        })
    }

    async fn return_loan(&self, loan_id: &str) -> AppResult<Loan> {
        let loan = self.get_loan(loan_id).await?;
        if loan.returned {
            // Already returned: observable no-op success.
            return Ok(loan);
        }

        let db = self.database().await?;
        db.collection::<Document>("loans")
            .update_one(
                doc! { "_id": object_id(loan_id)? },
                doc! { "$set": { "returned": true } },
            )
            .await
            .map_err(unavailable)?;

        self.get_loan(loan_id).await
    }

    async fn list_ratings(&self) -> AppResult<Vec<Rating>> {
        let db = self.database().await?;
        let mut cursor = db
            .collection::<Document>("ratings")
            .find(doc! {})
            .sort(doc! { "created_at": -1 })
            .await
            .map_err(unavailable)?;

        let mut ratings = Vec::new();
        while let Some(doc) = cursor.try_next().await.map_err(unavailable)? {
            if let Ok(oid) = doc.get_object_id("_id") {
                ratings.push(Rating {
                    id: oid.to_hex(),
                    name: doc.get_str("name").unwrap_or_default().to_string(),
                    comments: doc.get_str("comments").unwrap_or_default().to_string(),
                    rating: doc.get_i32("rating").unwrap_or(0),
                    created_at: doc_created_at(&doc),
                });
            }
        }
        Ok(ratings)
    }

    async fn create_rating(&self, input: CreateRating) -> AppResult<Rating> {
        let db = self.database().await?;
        let comments = input.comments.unwrap_or_default();
        let created_at = BsonDateTime::now();

        let payload = doc! {
            "name": &input.name,
            "comments": &comments,
            "rating": input.rating,
            "created_at": created_at,
        };
        let result = db
            .collection::<Document>("ratings")
            .insert_one(payload)
            .await
            .map_err(unavailable)?;
        let rating_oid = result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| AppError::Internal("insert did not return an ObjectId".to_string()))?;

        Ok(Rating {
            id: rating_oid.to_hex(),
            name: input.name,
            comments,
            rating: input.rating,
            created_at: DateTime::from_timestamp_millis(created_at.timestamp_millis())
                .unwrap_or_else(Utc::now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_id_rejects_malformed_tokens() {
        for raw in ["", "42", "not-a-valid-id", "zzzzzzzzzzzzzzzzzzzzzzzz"] {
            assert!(matches!(
                object_id(raw),
                Err(AppError::InvalidIdentity(_))
            ));
        }
    }

    #[test]
    fn object_id_accepts_hex_tokens() {
        assert!(object_id("64f1b2a9c0ffee0123456789").is_ok());
    }

    #[test]
    fn missing_title_degrades_to_sentinel() {
        assert_eq!(safe_title(&doc! {}), "Sin título");
        assert_eq!(safe_title(&doc! { "title": "" }), "Sin título");
        assert_eq!(safe_title(&doc! { "title": "Rayuela" }), "Rayuela");
    }

    #[test]
    fn dates_parse_leniently() {
        assert_eq!(parse_date("2024-01-15"), "2024-01-15".parse().ok());
        assert_eq!(parse_date("not-a-date"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn placeholders_carry_sentinel_names() {
        assert_eq!(unknown_author().name, "Autor desconocido");
        assert_eq!(unknown_user().name, "Usuario desconocido");
        assert_eq!(placeholder_book().title, "Libro desconocido");
    }
}

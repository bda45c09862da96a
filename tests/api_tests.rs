//! API integration tests
//!
//! These run against a live server with PostgreSQL (and optionally
//! MongoDB) behind it. Start the server, then:
//! cargo test -- --ignored

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";
const SESSION_HEADER: &str = "x-session-id";

fn session_id(prefix: &str) -> String {
    format!(
        "{}-{}",
        prefix,
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("clock before epoch")
            .as_nanos()
    )
}

async fn create_author(client: &Client, session: &str, name: &str) -> Value {
    let response = client
        .post(format!("{}/authors", BASE_URL))
        .header(SESSION_HEADER, session)
        .json(&json!({ "name": name }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    response.json().await.expect("Failed to parse response")
}

async fn create_book(client: &Client, session: &str, title: &str, author_id: &str) -> Value {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .header(SESSION_HEADER, session)
        .json(&json!({ "title": title, "year": 1984, "author_id": author_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    response.json().await.expect("Failed to parse response")
}

async fn create_user(client: &Client, session: &str, name: &str, email: &str) -> Value {
    let response = client
        .post(format!("{}/users", BASE_URL))
        .header(SESSION_HEADER, session)
        .json(&json!({ "name": name, "email": email }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    response.json().await.expect("Failed to parse response")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_list_books_defaults_to_sql() {
    let client = Client::new();
    let session = session_id("list-books");

    let response = client
        .get(format!("{}/books", BASE_URL))
        .header(SESSION_HEADER, &session)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["data"].is_array());
    assert_eq!(body["data_source"], "sql");
}

#[tokio::test]
#[ignore]
async fn test_loan_lifecycle() {
    let client = Client::new();
    let session = session_id("loan-lifecycle");

    let author = create_author(&client, &session, "Ursula K. Le Guin").await;
    let author_id = author["data"]["id"].as_str().expect("author id").to_string();

    let book = create_book(&client, &session, "Los desposeídos", &author_id).await;
    let book_id = book["data"]["id"].as_str().expect("book id").to_string();
    assert_eq!(book["data"]["is_loaned"], false);

    let email = format!("{}@example.com", session);
    let user = create_user(&client, &session, "Lectora", &email).await;
    let user_id = user["data"]["id"].as_str().expect("user id").to_string();

    // Loan the book
    let response = client
        .post(format!("{}/books/{}/loans", BASE_URL, book_id))
        .header(SESSION_HEADER, &session)
        .json(&json!({
            "user_id": user_id,
            "start_date": "2026-08-01",
            "end_date": "2026-08-15"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let loan: Value = response.json().await.expect("Failed to parse response");
    let loan_id = loan["data"]["id"].as_str().expect("loan id").to_string();
    assert_eq!(loan["data"]["returned"], false);

    // A second loan on the same book must conflict
    let response = client
        .post(format!("{}/books/{}/loans", BASE_URL, book_id))
        .header(SESSION_HEADER, &session)
        .json(&json!({
            "user_id": user_id,
            "start_date": "2026-08-02",
            "end_date": "2026-08-16"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    // The detail view reports the active loan
    let response = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .header(SESSION_HEADER, &session)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let detail: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(detail["data"]["book"]["is_loaned"], true);
    assert_eq!(detail["data"]["active_loan"]["id"], loan_id.as_str());

    // Return it, twice: the second call is an idempotent success
    for _ in 0..2 {
        let response = client
            .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
            .header(SESSION_HEADER, &session)
            .send()
            .await
            .expect("Failed to send request");
        assert!(response.status().is_success());
        let returned: Value = response.json().await.expect("Failed to parse response");
        assert_eq!(returned["data"]["returned"], true);
    }

    // And the book can be loaned again
    let response = client
        .post(format!("{}/books/{}/loans", BASE_URL, book_id))
        .header(SESSION_HEADER, &session)
        .json(&json!({
            "user_id": user_id,
            "start_date": "2026-08-20",
            "end_date": "2026-09-01"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
}

#[tokio::test]
#[ignore]
async fn test_user_loans_listing() {
    let client = Client::new();
    let session = session_id("user-loans");

    let author = create_author(&client, &session, "Jorge Luis Borges").await;
    let author_id = author["data"]["id"].as_str().expect("author id").to_string();
    let book = create_book(&client, &session, "Ficciones", &author_id).await;
    let book_id = book["data"]["id"].as_str().expect("book id").to_string();
    let email = format!("{}@example.com", session);
    let user = create_user(&client, &session, "Lector", &email).await;
    let user_id = user["data"]["id"].as_str().expect("user id").to_string();

    let response = client
        .post(format!("{}/books/{}/loans", BASE_URL, book_id))
        .header(SESSION_HEADER, &session)
        .json(&json!({
            "user_id": user_id,
            "start_date": "2026-08-10",
            "end_date": "2026-08-24"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    let response = client
        .get(format!("{}/users/{}/loans", BASE_URL, user_id))
        .header(SESSION_HEADER, &session)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["user"]["id"], user_id.as_str());
    let loans = body["data"]["loans"].as_array().expect("loans array");
    assert_eq!(loans.len(), 1);
    assert_eq!(loans[0]["book"]["id"], book_id.as_str());
}

#[tokio::test]
#[ignore]
async fn test_malformed_id_is_rejected() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books/not-a-number", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_missing_book_is_404() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books/999999999", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_loan_with_end_before_start_is_rejected() {
    let client = Client::new();
    let session = session_id("bad-dates");

    let author = create_author(&client, &session, "Autor de prueba").await;
    let author_id = author["data"]["id"].as_str().expect("author id").to_string();
    let book = create_book(&client, &session, "Fechas raras", &author_id).await;
    let book_id = book["data"]["id"].as_str().expect("book id").to_string();
    let email = format!("{}@example.com", session);
    let user = create_user(&client, &session, "Usuario", &email).await;
    let user_id = user["data"]["id"].as_str().expect("user id").to_string();

    let response = client
        .post(format!("{}/books/{}/loans", BASE_URL, book_id))
        .header(SESSION_HEADER, &session)
        .json(&json!({
            "user_id": user_id,
            "start_date": "2026-08-15",
            "end_date": "2026-08-01"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_rating_bounds() {
    let client = Client::new();

    for bad in [0, 11] {
        let response = client
            .post(format!("{}/ratings", BASE_URL))
            .json(&json!({ "name": "Visitante", "rating": bad }))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), 400);
    }

    let response = client
        .post(format!("{}/ratings", BASE_URL))
        .json(&json!({ "name": "Visitante", "comments": "Muy buena", "rating": 9 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["rating"], 9);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_email_conflicts() {
    let client = Client::new();
    let session = session_id("dup-email");
    let email = format!("{}@example.com", session);

    create_user(&client, &session, "Primera", &email).await;

    let response = client
        .post(format!("{}/users", BASE_URL))
        .header(SESSION_HEADER, &session)
        .json(&json!({ "name": "Segunda", "email": email }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_data_source_switch_is_per_session() {
    let client = Client::new();
    let session = session_id("switch");

    // Fresh sessions start on SQL
    let response = client
        .get(format!("{}/data-source", BASE_URL))
        .header(SESSION_HEADER, &session)
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["current"], "sql");
    assert_eq!(body["alternate"], "mongo");

    // Unknown values are rejected
    let response = client
        .post(format!("{}/data-source", BASE_URL))
        .header(SESSION_HEADER, &session)
        .json(&json!({ "source": "cassandra" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);

    // Switch to Mongo; the outcome depends on deployment capability
    let response = client
        .post(format!("{}/data-source", BASE_URL))
        .header(SESSION_HEADER, &session)
        .json(&json!({ "source": "mongo" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    let switched = body["current"] == "mongo";

    if switched {
        // Requests from this session now report their serving backend;
        // if Mongo is down this is where the automatic fallback shows up.
        let response = client
            .get(format!("{}/books", BASE_URL))
            .header(SESSION_HEADER, &session)
            .send()
            .await
            .expect("Failed to send request");
        assert!(response.status().is_success());
        let body: Value = response.json().await.expect("Failed to parse response");
        let source = body["data_source"].as_str().expect("data_source");
        assert!(source == "mongo" || source == "sql");
        if source == "sql" {
            let notices = body["notices"].as_array().expect("notices");
            assert!(notices.iter().any(|n| n["level"] == "warning"));
        }
    }

    // Other sessions are unaffected
    let other = session_id("switch-other");
    let response = client
        .get(format!("{}/data-source", BASE_URL))
        .header(SESSION_HEADER, &other)
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["current"], "sql");
}

//! Biblioteca Server
//!
//! A REST JSON API for a small library: books, authors, users, loans and
//! site ratings, served from either a relational (PostgreSQL) or a
//! document (MongoDB) backend. Each session picks its backend; when the
//! document backend is unreachable the session falls back to SQL
//! automatically and stays there.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;
pub mod session;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

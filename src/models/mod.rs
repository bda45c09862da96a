//! Backend-agnostic domain models.
//!
//! Every identity crossing the repository boundary is an opaque string:
//! the relational backend maps it to an integer key, the document backend
//! to an ObjectId token.

pub mod author;
pub mod book;
pub mod loan;
pub mod rating;
pub mod user;

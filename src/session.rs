//! Per-session data-source selection.
//!
//! Each session carries one flag: which persistence backend serves its
//! requests. The relational backend is the default and the backend of last
//! resort; the façade flips a session back to it when the document backend
//! is unreachable.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use utoipa::ToSchema;

/// The two interchangeable persistence backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Sql,
    Mongo,
}

impl DataSource {
    /// The backend not currently active, used to render a "switch to X"
    /// affordance.
    pub fn other(self) -> Self {
        match self {
            DataSource::Sql => DataSource::Mongo,
            DataSource::Mongo => DataSource::Sql,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DataSource::Sql => "sql",
            DataSource::Mongo => "mongo",
        }
    }

    /// Human-readable label for user-facing notices.
    pub fn label(self) -> &'static str {
        match self {
            DataSource::Sql => "SQL",
            DataSource::Mongo => "MongoDB",
        }
    }

    /// Parse a stored or submitted value. Unrecognized values yield `None`
    /// so callers fall back to the default source.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "sql" => Some(DataSource::Sql),
            "mongo" => Some(DataSource::Mongo),
            _ => None,
        }
    }
}

/// In-process store of each session's active backend.
///
/// Sessions are identified by an opaque id supplied by the client. Unknown
/// sessions resolve to the relational default, so a corrupt or missing
/// entry self-heals on the next read. Concurrent writes from the same
/// session are last-write-wins.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, DataSource>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The active backend for a session, defaulting to SQL.
    pub fn active(&self, session_id: &str) -> DataSource {
        self.inner
            .read()
            .map(|sessions| sessions.get(session_id).copied())
            .unwrap_or_default()
            .unwrap_or(DataSource::Sql)
    }

    pub fn set_active(&self, session_id: &str, source: DataSource) {
        if let Ok(mut sessions) = self.inner.write() {
            sessions.insert(session_id.to_string(), source);
        }
    }
}

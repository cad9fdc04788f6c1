//! Request and response types for search engine operations.

use std::time::Duration;

use elastices_shared::Document;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameters for opening a scroll cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollRequest {
    /// Index to read from.
    pub index: String,
    /// Opaque query body, passed to the engine unmodified.
    pub query: Value,
    /// Number of documents per page.
    pub batch_size: usize,
    /// How long the server keeps the cursor alive between fetches.
    pub keep_alive: Duration,
    /// Optional routing tag restricting the search.
    pub routing: Option<String>,
}

/// One page of a scroll.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScrollPage {
    /// Cursor token to use for the next fetch. The engine may hand out a new
    /// token with every page.
    pub scroll_id: Option<String>,
    /// Documents in this page. An empty page marks the end of the scroll.
    pub documents: Vec<Document>,
}

/// Per-document status from a bulk response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkItemStatus {
    /// The document `_id` the engine reported.
    pub id: String,
    /// HTTP-style status for this item.
    pub status: u16,
    /// Rejection reason if the item failed.
    pub error: Option<String>,
}

impl BulkItemStatus {
    /// Create a status for an accepted item.
    pub fn accepted(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: 201,
            error: None,
        }
    }

    /// Create a status for a rejected item.
    pub fn rejected(id: impl Into<String>, status: u16, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status,
            error: Some(reason.into()),
        }
    }

    /// Whether the engine accepted this item.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && (200..300).contains(&self.status)
    }
}

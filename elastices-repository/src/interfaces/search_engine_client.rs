//! Search engine client trait definition.
//!
//! This module defines the abstract interface for the engine operations the
//! loader relies on, allowing for different backend implementations
//! (OpenSearch, Elasticsearch, in-memory fakes, etc.).

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::SearchError;
use crate::types::{BulkItemStatus, ScrollPage, ScrollRequest};
use elastices_shared::Document;

/// Abstract interface for search engine operations.
///
/// Each method maps to exactly one network request. Retrying, batching and
/// cursor bookkeeping are the caller's concern.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` to allow use across async tasks.
///
/// # Error Handling
///
/// All methods return `Result<T, SearchError>`. Use
/// [`SearchError::is_retryable`] to tell transient failures apart.
#[async_trait]
pub trait SearchEngineClient: Send + Sync {
    /// Check whether an index exists.
    async fn index_exists(&self, index: &str) -> Result<bool, SearchError>;

    /// Create an index with default settings.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the index was created
    /// * `Err(SearchError::IndexAlreadyExists)` - If another writer created it first
    /// * `Err(SearchError)` - If creation fails
    async fn create_index(&self, index: &str) -> Result<(), SearchError>;

    /// Delete every document matching `query` and return the number deleted.
    ///
    /// The index is refreshed before returning so that the deletion is
    /// visible to subsequent reads.
    async fn delete_by_query(&self, index: &str, query: &Value) -> Result<u64, SearchError>;

    /// Run the initial search of a scroll and return its first page.
    async fn open_scroll(&self, request: &ScrollRequest) -> Result<ScrollPage, SearchError>;

    /// Fetch the page following `scroll_id`, extending the cursor by `keep_alive`.
    ///
    /// # Returns
    ///
    /// * `Ok(ScrollPage)` - The next page, empty once the scroll is exhausted
    /// * `Err(SearchError::CursorExpired)` - If the server dropped the cursor
    async fn next_scroll(
        &self,
        scroll_id: &str,
        keep_alive: Duration,
    ) -> Result<ScrollPage, SearchError>;

    /// Release a scroll cursor on the server. Releasing an unknown cursor succeeds.
    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), SearchError>;

    /// Index documents in a single bulk request.
    ///
    /// # Arguments
    ///
    /// * `index` - Target index
    /// * `routing` - Optional routing tag attached to every item
    /// * `documents` - Documents to index, keyed by their `id`
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<BulkItemStatus>)` - One status per item the engine reported on
    /// * `Err(SearchError)` - If the request as a whole failed
    async fn bulk_index(
        &self,
        index: &str,
        routing: Option<&str>,
        documents: &[Document],
    ) -> Result<Vec<BulkItemStatus>, SearchError>;

    /// Check if the search engine is healthy and reachable.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the cluster status is green or yellow
    /// * `Ok(false)` - If the search engine is unhealthy
    /// * `Err(SearchError)` - If the health check fails to execute
    async fn health_check(&self) -> Result<bool, SearchError>;
}

//! Index lifecycle: make sure an index exists, and empty it.

use tracing::{debug, info, instrument};

use elastices_repository::opensearch::match_all_query;
use elastices_repository::{SearchEngineClient, SearchError};

use crate::connection::Connection;
use crate::errors::ClientError;
use crate::retry::{with_retry, RetryPolicy};

/// Creates and truncates indices on a live connection.
pub struct IndexManager {
    connection: Connection,
    policy: RetryPolicy,
}

impl IndexManager {
    /// Create a manager issuing requests on `connection` with `policy`.
    pub fn new(connection: Connection, policy: RetryPolicy) -> Self {
        Self { connection, policy }
    }

    /// Create `index` with default settings unless it already exists.
    ///
    /// Returns `true` when this call created the index. An index created
    /// concurrently between the existence check and the create request is
    /// reported as `false`.
    #[instrument(skip(self))]
    pub async fn ensure_index(&self, index: &str) -> Result<bool, ClientError> {
        let engine: &dyn SearchEngineClient = self.connection.require_live("ensure_index")?.as_ref();

        let exists = with_retry(&self.policy, "index_exists", move || engine.index_exists(index))
            .await
            .map_err(|failure| failure.error)?;
        if exists {
            debug!(index = %index, "Index already exists");
            return Ok(false);
        }

        match with_retry(&self.policy, "create_index", move || engine.create_index(index)).await {
            Ok(()) => {
                info!(index = %index, "Created index");
                Ok(true)
            }
            Err(failure) => match failure.error {
                SearchError::IndexAlreadyExists(_) => {
                    debug!(index = %index, "Index was created concurrently");
                    Ok(false)
                }
                error => Err(error.into()),
            },
        }
    }

    /// Delete every document in `index`, leaving the index in place.
    ///
    /// Returns the number of documents deleted.
    ///
    /// # Errors
    ///
    /// * `ClientError::IndexNotFound` - If the index does not exist; nothing is deleted
    #[instrument(skip(self))]
    pub async fn truncate(&self, index: &str) -> Result<u64, ClientError> {
        let engine: &dyn SearchEngineClient = self.connection.require_live("truncate_index")?.as_ref();

        let exists = with_retry(&self.policy, "index_exists", move || engine.index_exists(index))
            .await
            .map_err(|failure| failure.error)?;
        if !exists {
            return Err(ClientError::IndexNotFound(index.to_string()));
        }

        let query = match_all_query();
        let query_ref = &query;
        let deleted = with_retry(&self.policy, "delete_by_query", move || {
            engine.delete_by_query(index, query_ref)
        })
        .await
        .map_err(|failure| failure.error)?;

        info!(index = %index, deleted = deleted, "Truncated index");
        Ok(deleted)
    }
}

//! Client façade.
//!
//! Owns the connection lifecycle and composes the codec, scroll reader, bulk
//! writer and index manager into the public operations.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{info, instrument, warn};

use elastices_repository::opensearch::match_all_query;
use elastices_repository::{
    ConnectionConfig, Connector, OpenSearchConnector, ScrollRequest, SearchEngineClient,
};
use elastices_shared::{Table, WriteReport};

use crate::bulk::BulkWriter;
use crate::codec::{documents_to_table, rows_to_documents};
use crate::connection::Connection;
use crate::errors::ClientError;
use crate::index::IndexManager;
use crate::retry::{with_retry, RetryPolicy};
use crate::scroll::ScrollReader;

enum ConnectionState {
    Disconnected,
    Connected(Connection),
}

/// Handle to one search engine connection.
///
/// ```text
/// Disconnected --connect()--> Connected --disconnect()--> Disconnected
/// ```
///
/// Every data operation requires `Connected` and fails with
/// `ClientError::NotConnected` otherwise, without touching the network.
/// The handle is not meant to be shared between tasks; use one handle per
/// task when parallelism is needed.
pub struct Client {
    config: ConnectionConfig,
    policy: RetryPolicy,
    connector: Arc<dyn Connector>,
    state: ConnectionState,
}

impl Client {
    /// Create a disconnected client that will talk to OpenSearch.
    pub fn new(config: ConnectionConfig) -> Self {
        Self::with_connector(config, Arc::new(OpenSearchConnector))
    }

    /// Create a disconnected client using a custom connector.
    pub fn with_connector(config: ConnectionConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            policy: RetryPolicy::from_config(&config),
            config,
            connector,
            state: ConnectionState::Disconnected,
        }
    }

    /// Create a client and connect it.
    pub async fn connect_to(config: ConnectionConfig) -> Result<Self, ClientError> {
        let mut client = Self::new(config);
        client.connect().await?;
        Ok(client)
    }

    /// The configuration this client connects with.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Whether the client currently holds a live connection.
    pub fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected(_))
    }

    /// Open a connection.
    ///
    /// Calling this while connected replaces the connection. Readers opened
    /// on the previous connection fail their next fetch with `NotConnected`.
    #[instrument(skip(self), fields(url = %self.config.url))]
    pub async fn connect(&mut self) -> Result<(), ClientError> {
        self.config.validate()?;
        let engine = self.connector.connect(&self.config).await?;

        let previous = std::mem::replace(
            &mut self.state,
            ConnectionState::Connected(Connection::new(engine)),
        );
        if let ConnectionState::Connected(old) = previous {
            warn!("Replacing existing connection");
            old.invalidate();
        }

        info!(url = %self.config.url, "Connected to search engine");
        Ok(())
    }

    /// Close the connection.
    ///
    /// # Errors
    ///
    /// * `ClientError::NotConnected` - If the client is not connected
    pub fn disconnect(&mut self) -> Result<(), ClientError> {
        match std::mem::replace(&mut self.state, ConnectionState::Disconnected) {
            ConnectionState::Connected(connection) => {
                connection.invalidate();
                info!(url = %self.config.url, "Disconnected from search engine");
                Ok(())
            }
            ConnectionState::Disconnected => Err(ClientError::not_connected("disconnect")),
        }
    }

    /// Whether the cluster reports a green or yellow status.
    pub async fn health_check(&self) -> Result<bool, ClientError> {
        let engine: &dyn SearchEngineClient = self.connection("health_check")?.engine().as_ref();
        with_retry(&self.policy, "health_check", move || engine.health_check())
            .await
            .map_err(|failure| failure.error.into())
    }

    /// Open a scroll over `index`.
    ///
    /// A `Value::Null` body matches every document. `batch_size` and
    /// `keep_alive` fall back to the config when not given. The configured
    /// doc type, if any, is sent as the search routing.
    #[instrument(skip(self, body))]
    pub async fn query(
        &self,
        index: &str,
        body: Value,
        batch_size: Option<usize>,
        keep_alive: Option<Duration>,
    ) -> Result<ScrollReader, ClientError> {
        let connection = self.connection("query")?.clone();
        let query = if body.is_null() { match_all_query() } else { body };

        let request = ScrollRequest {
            index: index.to_string(),
            query,
            batch_size: batch_size.unwrap_or(self.config.batch_size).max(1),
            keep_alive: keep_alive.unwrap_or(self.config.scroll_keep_alive),
            routing: self.config.doc_type.clone(),
        };

        ScrollReader::open(connection, request, self.policy).await
    }

    /// Read the whole result of a query into a table.
    ///
    /// The entire result set is held in memory. Use [`query`](Self::query)
    /// for bounded memory.
    pub async fn query_as_table(&self, index: &str, body: Value) -> Result<Table, ClientError> {
        let reader = self.query(index, body, None, None).await?;
        let documents = reader.collect_all().await?;
        documents_to_table(&documents)
    }

    /// Write every row of `table` as a document in `index`.
    ///
    /// The table is validated before any request is sent. The index is
    /// created if missing. `doc_type` overrides the configured routing tag.
    /// Per-document rejections and failed chunks are returned in the report.
    #[instrument(skip(self, table), fields(rows = table.num_rows()))]
    pub async fn write_table(
        &self,
        table: &Table,
        index: &str,
        doc_type: Option<&str>,
        identifier_column: &str,
    ) -> Result<WriteReport, ClientError> {
        let connection = self.connection("write_table")?;
        let documents = rows_to_documents(table, identifier_column)?;

        IndexManager::new(connection.clone(), self.policy)
            .ensure_index(index)
            .await?;

        let routing = doc_type.or(self.config.doc_type.as_deref());
        BulkWriter::new(connection.clone(), self.config.batch_size, self.policy)
            .write(index, &documents, routing)
            .await
    }

    /// Delete every document in `index` and return how many were deleted.
    pub async fn truncate_index(&self, index: &str) -> Result<u64, ClientError> {
        let connection = self.connection("truncate_index")?;
        IndexManager::new(connection.clone(), self.policy)
            .truncate(index)
            .await
    }

    /// Create `index` if it does not exist. Returns whether it was created.
    pub async fn ensure_index(&self, index: &str) -> Result<bool, ClientError> {
        let connection = self.connection("ensure_index")?;
        IndexManager::new(connection.clone(), self.policy)
            .ensure_index(index)
            .await
    }

    fn connection(&self, operation: &str) -> Result<&Connection, ClientError> {
        match &self.state {
            ConnectionState::Connected(connection) => Ok(connection),
            ConnectionState::Disconnected => Err(ClientError::not_connected(operation)),
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

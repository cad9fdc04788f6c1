//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `SearchEngineClient`
//! using the OpenSearch Rust client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use opensearch::{
    cluster::ClusterHealthParts,
    http::{
        request::JsonBody,
        response::Response,
        transport::{SingleNodeConnectionPool, TransportBuilder},
    },
    indices::{IndicesCreateParts, IndicesExistsParts},
    BulkParts, ClearScrollParts, DeleteByQueryParts, OpenSearch, ScrollParts, SearchParts,
};
use serde_json::Value;
use tracing::{debug, error, info, instrument};
use url::Url;

use crate::config::{format_keep_alive, ConnectionConfig};
use crate::errors::SearchError;
use crate::interfaces::{Connector, SearchEngineClient};
use crate::opensearch::queries::{build_bulk_lines, build_clear_scroll_body, build_scroll_body};
use crate::opensearch::responses::{parse_bulk_items, parse_scroll_page};
use crate::types::{BulkItemStatus, ScrollPage, ScrollRequest};
use elastices_shared::Document;

/// OpenSearch client implementation.
///
/// Every request carries the configured timeout, so a slow fetch in the
/// middle of a long scroll fails on its own rather than eating into a
/// budget shared with the rest of the session.
///
/// # Example
///
/// ```ignore
/// let config = ConnectionConfig::new("http://localhost:9200");
/// let client = OpenSearchClient::new(&config)?;
///
/// if !client.index_exists("people").await? {
///     client.create_index("people").await?;
/// }
/// ```
pub struct OpenSearchClient {
    client: OpenSearch,
    timeout: Duration,
}

impl OpenSearchClient {
    /// Create a new OpenSearch client for the configured URL.
    ///
    /// No request is sent; the transport connects lazily.
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchClient)` - A new client instance
    /// * `Err(SearchError)` - If the URL is invalid or transport setup fails
    pub fn new(config: &ConnectionConfig) -> Result<Self, SearchError> {
        config.validate()?;

        let parsed_url =
            Url::parse(&config.url).map_err(|e| SearchError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %config.url,
            timeout_ms = config.timeout.as_millis() as u64,
            "Created OpenSearch client"
        );

        Ok(Self {
            client,
            timeout: config.timeout,
        })
    }

    /// Turn a non-success response into a typed error, or parse its JSON body.
    async fn read_json(response: Response) -> Result<Value, SearchError> {
        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            debug!(status = %status, body = %error_body, "Request returned error status");
            return Err(SearchError::from_status(status.as_u16(), error_body));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))
    }
}

#[async_trait]
impl SearchEngineClient for OpenSearchClient {
    #[instrument(skip(self))]
    async fn index_exists(&self, index: &str) -> Result<bool, SearchError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .request_timeout(self.timeout)
            .send()
            .await?;

        match response.status_code().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            status => {
                let error_body = response.text().await.unwrap_or_default();
                Err(SearchError::from_status(status, error_body))
            }
        }
    }

    #[instrument(skip(self))]
    async fn create_index(&self, index: &str) -> Result<(), SearchError> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .request_timeout(self.timeout)
            .send()
            .await?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return match SearchError::from_status(status.as_u16(), error_body) {
                SearchError::ServerError { status, message } => {
                    error!(status = status, body = %message, "Index creation failed");
                    Err(SearchError::IndexCreationError(format!(
                        "Create failed with status {}: {}",
                        status, message
                    )))
                }
                other => Err(other),
            };
        }

        info!(index = %index, "Created index");
        Ok(())
    }

    #[instrument(skip(self, query))]
    async fn delete_by_query(&self, index: &str, query: &Value) -> Result<u64, SearchError> {
        let response = self
            .client
            .delete_by_query(DeleteByQueryParts::Index(&[index]))
            .refresh(true)
            .request_timeout(self.timeout)
            .body(query.clone())
            .send()
            .await?;

        let body = Self::read_json(response).await.map_err(|e| match e {
            SearchError::ServerError { status, message } => SearchError::DeleteError(format!(
                "Delete by query failed with status {}: {}",
                status, message
            )),
            other => other,
        })?;

        body.get("deleted")
            .and_then(|d| d.as_u64())
            .ok_or_else(|| SearchError::parse("Delete by query response is missing 'deleted'"))
    }

    #[instrument(skip(self, request), fields(index = %request.index, batch_size = request.batch_size))]
    async fn open_scroll(&self, request: &ScrollRequest) -> Result<ScrollPage, SearchError> {
        let keep_alive = format_keep_alive(request.keep_alive);
        let indices = [request.index.as_str()];
        let routing: Vec<&str> = request.routing.iter().map(String::as_str).collect();

        let mut search = self
            .client
            .search(SearchParts::Index(&indices))
            .scroll(&keep_alive)
            .size(request.batch_size as i64)
            .request_timeout(self.timeout)
            .body(request.query.clone());
        if !routing.is_empty() {
            search = search.routing(&routing);
        }

        let response = search.send().await?;
        let body = Self::read_json(response).await.map_err(|e| match e {
            SearchError::ServerError { status, message } => SearchError::query(format!(
                "Search failed with status {}: {}",
                status, message
            )),
            other => other,
        })?;

        parse_scroll_page(&body)
    }

    async fn next_scroll(
        &self,
        scroll_id: &str,
        keep_alive: Duration,
    ) -> Result<ScrollPage, SearchError> {
        let response = self
            .client
            .scroll(ScrollParts::None)
            .request_timeout(self.timeout)
            .body(build_scroll_body(scroll_id, &format_keep_alive(keep_alive)))
            .send()
            .await?;

        let body = Self::read_json(response).await?;
        parse_scroll_page(&body)
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), SearchError> {
        let response = self
            .client
            .clear_scroll(ClearScrollParts::None)
            .request_timeout(self.timeout)
            .body(build_clear_scroll_body(scroll_id))
            .send()
            .await?;

        let status = response.status_code();
        // 404 means the cursor is already gone
        if !status.is_success() && status.as_u16() != 404 {
            let error_body = response.text().await.unwrap_or_default();
            return Err(SearchError::from_status(status.as_u16(), error_body));
        }

        debug!("Scroll cursor released");
        Ok(())
    }

    #[instrument(skip(self, documents), fields(count = documents.len()))]
    async fn bulk_index(
        &self,
        index: &str,
        routing: Option<&str>,
        documents: &[Document],
    ) -> Result<Vec<BulkItemStatus>, SearchError> {
        let body: Vec<JsonBody<Value>> = build_bulk_lines(index, routing, documents)
            .into_iter()
            .map(|line| line.into())
            .collect();

        let response = self
            .client
            .bulk(BulkParts::Index(index))
            .request_timeout(self.timeout)
            .body(body)
            .send()
            .await?;

        let body = Self::read_json(response).await.map_err(|e| match e {
            SearchError::ServerError { status, message } if status < 500 && status != 429 => {
                SearchError::bulk_index(format!(
                    "Bulk request rejected with status {}: {}",
                    status, message
                ))
            }
            other => other,
        })?;

        parse_bulk_items(&body)
    }

    async fn health_check(&self) -> Result<bool, SearchError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .request_timeout(self.timeout)
            .send()
            .await?;

        let health = Self::read_json(response).await?;
        let status = health
            .get("status")
            .and_then(|s| s.as_str())
            .unwrap_or("unknown");

        debug!(status = %status, "Cluster health");
        Ok(status == "green" || status == "yellow")
    }
}

/// Connector producing `OpenSearchClient` instances.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenSearchConnector;

#[async_trait]
impl Connector for OpenSearchConnector {
    async fn connect(
        &self,
        config: &ConnectionConfig,
    ) -> Result<Arc<dyn SearchEngineClient>, SearchError> {
        let client = OpenSearchClient::new(config)?;
        Ok(Arc::new(client))
    }
}

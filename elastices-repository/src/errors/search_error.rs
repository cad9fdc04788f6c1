//! Search error types.
//!
//! This module defines the error types that can occur during search engine
//! operations, and classifies which of them are worth retrying.

use thiserror::Error;

/// Errors that can occur during search engine operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    /// Failed to establish or keep a connection to the search engine.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// A single request exceeded the configured timeout.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The server no longer holds the scroll context.
    #[error("Scroll cursor expired: {0}")]
    CursorExpired(String),

    /// The target index does not exist.
    #[error("Index not found: {0}")]
    IndexNotFound(String),

    /// The target index already exists.
    #[error("Index already exists: {0}")]
    IndexAlreadyExists(String),

    /// Search query execution failed.
    #[error("Query error: {0}")]
    QueryError(String),

    /// The bulk request as a whole was rejected.
    #[error("Bulk index error: {0}")]
    BulkIndexError(String),

    /// Failed to create the search index.
    #[error("Index creation error: {0}")]
    IndexCreationError(String),

    /// Delete-by-query failed.
    #[error("Delete error: {0}")]
    DeleteError(String),

    /// Failed to parse response from search engine.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failed to serialize data for the search engine.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Invalid connection configuration.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The engine answered with an unexpected HTTP status.
    #[error("Server error (status {status}): {message}")]
    ServerError { status: u16, message: String },
}

impl SearchError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a timeout error.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a query error.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryError(msg.into())
    }

    /// Create a bulk index error.
    pub fn bulk_index(msg: impl Into<String>) -> Self {
        Self::BulkIndexError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::ConfigurationError(msg.into())
    }

    /// Classify a non-success HTTP response.
    ///
    /// Missing indices and missing scroll contexts both come back as 404 and
    /// are told apart by the exception type in the body.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            404 if body.contains("index_not_found_exception") => Self::IndexNotFound(body),
            404 if body.contains("search_context_missing_exception")
                || body.contains("No search context found") =>
            {
                Self::CursorExpired(body)
            }
            400 if body.contains("resource_already_exists_exception") => {
                Self::IndexAlreadyExists(body)
            }
            408 => Self::Timeout(body),
            _ => Self::ServerError {
                status,
                message: body,
            },
        }
    }

    /// Determine if an error is retryable (transient failures).
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionError(_) | Self::Timeout(_) => true,
            // Rate limiting and gateway/availability failures
            Self::ServerError { status, .. } => matches!(status, 429 | 502 | 503 | 504),
            Self::CursorExpired(_)
            | Self::IndexNotFound(_)
            | Self::IndexAlreadyExists(_)
            | Self::QueryError(_)
            | Self::BulkIndexError(_)
            | Self::IndexCreationError(_)
            | Self::DeleteError(_)
            | Self::ParseError(_)
            | Self::SerializationError(_)
            | Self::ConfigurationError(_) => false,
        }
    }
}

impl From<opensearch::Error> for SearchError {
    fn from(err: opensearch::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout(err.to_string());
        }
        match err.status_code() {
            Some(status) => Self::from_status(status.as_u16(), err.to_string()),
            None => Self::ConnectionError(err.to_string()),
        }
    }
}

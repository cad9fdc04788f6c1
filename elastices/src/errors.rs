//! Error types for the elastices client.

use elastices_repository::SearchError;
use elastices_shared::TableError;
use thiserror::Error;

/// Errors that can occur in client operations.
///
/// Partial failures of a bulk write are not errors; they are reported in the
/// returned `WriteReport`.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The operation needs a live connection.
    #[error("Not connected: cannot {0} before connect()")]
    NotConnected(String),

    /// The input table does not fit the requested operation.
    #[error("Schema error: {0}")]
    Schema(String),

    /// An identifier value appears more than once in the input table.
    #[error("Duplicate identifier '{id}' in column '{column}'")]
    DuplicateIdentifier { column: String, id: String },

    /// A scroll fetch kept failing after all retries.
    #[error("Scroll failed after {attempts} attempt(s): {source}")]
    ScrollFailure { attempts: u32, source: SearchError },

    /// The server dropped the scroll cursor. Open a new one to continue.
    #[error("Scroll cursor expired: {0}")]
    CursorExpired(String),

    /// The target index does not exist.
    #[error("Index not found: {0}")]
    IndexNotFound(String),

    /// The input table is malformed.
    #[error("Table error: {0}")]
    Table(#[from] TableError),

    /// Any other search engine failure.
    #[error("Search error: {0}")]
    Search(SearchError),
}

impl ClientError {
    /// Create a not-connected error for the named operation.
    pub fn not_connected(operation: impl Into<String>) -> Self {
        Self::NotConnected(operation.into())
    }

    /// Create a schema error.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }
}

impl From<SearchError> for ClientError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::IndexNotFound(msg) => Self::IndexNotFound(msg),
            SearchError::CursorExpired(msg) => Self::CursorExpired(msg),
            other => Self::Search(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_error_conversion() {
        assert!(matches!(
            ClientError::from(SearchError::IndexNotFound("people".to_string())),
            ClientError::IndexNotFound(_)
        ));
        assert!(matches!(
            ClientError::from(SearchError::CursorExpired("gone".to_string())),
            ClientError::CursorExpired(_)
        ));
        assert!(matches!(
            ClientError::from(SearchError::connection("reset")),
            ClientError::Search(SearchError::ConnectionError(_))
        ));
    }

    #[test]
    fn test_display() {
        let err = ClientError::DuplicateIdentifier {
            column: "indexId".to_string(),
            id: "7".to_string(),
        };
        assert_eq!(err.to_string(), "Duplicate identifier '7' in column 'indexId'");

        let err = ClientError::not_connected("query");
        assert_eq!(err.to_string(), "Not connected: cannot query before connect()");
    }
}

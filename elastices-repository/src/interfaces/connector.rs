//! Connector trait definition.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ConnectionConfig;
use crate::errors::SearchError;
use crate::interfaces::SearchEngineClient;

/// Produces a live engine client from a connection config.
///
/// The loader's façade holds a connector rather than a client so that
/// `connect` can build a fresh connection each time it is called.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a new connection.
    async fn connect(
        &self,
        config: &ConnectionConfig,
    ) -> Result<Arc<dyn SearchEngineClient>, SearchError>;
}

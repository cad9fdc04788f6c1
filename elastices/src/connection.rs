//! A live engine connection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use elastices_repository::SearchEngineClient;

use crate::errors::ClientError;

/// An engine client together with a liveness flag.
///
/// Clones share the flag. When the owning [`Client`](crate::Client)
/// disconnects or reconnects it invalidates the connection, and any reader
/// still holding a clone fails its next request with `NotConnected`.
#[derive(Clone)]
pub struct Connection {
    engine: Arc<dyn SearchEngineClient>,
    live: Arc<AtomicBool>,
}

impl Connection {
    /// Wrap an engine client in a new live connection.
    pub fn new(engine: Arc<dyn SearchEngineClient>) -> Self {
        Self {
            engine,
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    /// The underlying engine client.
    pub fn engine(&self) -> &Arc<dyn SearchEngineClient> {
        &self.engine
    }

    /// Whether the connection is still usable.
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Mark the connection as closed for every clone.
    pub fn invalidate(&self) {
        self.live.store(false, Ordering::Release);
    }

    /// Return the engine if the connection is live.
    pub(crate) fn require_live(
        &self,
        operation: &str,
    ) -> Result<&Arc<dyn SearchEngineClient>, ClientError> {
        if self.is_live() {
            Ok(&self.engine)
        } else {
            Err(ClientError::not_connected(operation))
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("live", &self.is_live())
            .finish_non_exhaustive()
    }
}

//! Scroll reader.
//!
//! Drives the engine's cursor protocol to read a query result in pages.
//! A reader is a single forward pass: once a page has been returned it is
//! never fetched again, and an exhausted or failed reader stays finished.
//! Read the data again by opening a new reader.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, Stream, TryStreamExt};
use tracing::{debug, instrument, warn};

use elastices_repository::{ScrollRequest, SearchEngineClient, SearchError};
use elastices_shared::Document;

use crate::connection::Connection;
use crate::errors::ClientError;
use crate::retry::{with_retry, RetryPolicy};

/// One page returned by [`ScrollReader::next_batch`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScrollBatch {
    /// Documents in this page. Empty only at end of stream.
    pub documents: Vec<Document>,
    /// True once the scroll is exhausted; no further pages will follow.
    pub end_of_stream: bool,
}

impl ScrollBatch {
    fn page(documents: Vec<Document>) -> Self {
        Self {
            documents,
            end_of_stream: false,
        }
    }

    fn end() -> Self {
        Self {
            documents: Vec::new(),
            end_of_stream: true,
        }
    }
}

/// Forward-only reader over a server-side scroll cursor.
///
/// The cursor is released on the server when the scroll is exhausted, when
/// [`close`](Self::close) is called, when a fetch fails for good, and when
/// the reader is dropped mid-scroll. Release is best-effort: a failed release
/// is logged, and the server frees the cursor once its keep-alive lapses.
pub struct ScrollReader {
    connection: Connection,
    keep_alive: Duration,
    policy: RetryPolicy,
    cursor: Option<String>,
    first_page: Option<Vec<Document>>,
    finished: bool,
}

impl ScrollReader {
    /// Open a scroll by running the initial search.
    ///
    /// The initial search is retried on transient failures like any fetch.
    ///
    /// # Errors
    ///
    /// * `ClientError::NotConnected` - If the connection has been closed
    /// * `ClientError::IndexNotFound` - If the index does not exist
    /// * `ClientError::ScrollFailure` - If the search kept failing
    #[instrument(skip(connection, request, policy), fields(index = %request.index))]
    pub async fn open(
        connection: Connection,
        request: ScrollRequest,
        policy: RetryPolicy,
    ) -> Result<Self, ClientError> {
        let engine: &dyn SearchEngineClient = connection.require_live("query")?.as_ref();
        let request_ref = &request;

        let page = with_retry(&policy, "open_scroll", move || engine.open_scroll(request_ref))
            .await
            .map_err(|failure| match failure.error {
                SearchError::IndexNotFound(msg) => ClientError::IndexNotFound(msg),
                SearchError::CursorExpired(msg) => ClientError::CursorExpired(msg),
                error => ClientError::ScrollFailure {
                    attempts: failure.attempts,
                    source: error,
                },
            })?;

        debug!(
            documents = page.documents.len(),
            has_cursor = page.scroll_id.is_some(),
            "Scroll opened"
        );

        let mut reader = Self {
            connection,
            keep_alive: request.keep_alive,
            policy,
            cursor: page.scroll_id,
            first_page: None,
            finished: false,
        };

        if page.documents.is_empty() {
            reader.finish().await;
        } else {
            reader.first_page = Some(page.documents);
        }

        Ok(reader)
    }

    /// The current server cursor token, if the cursor is still held.
    pub fn scroll_id(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// Whether the reader has reached the end of the scroll or failed.
    pub fn is_finished(&self) -> bool {
        self.finished && self.first_page.is_none()
    }

    /// Fetch the next page.
    ///
    /// Returns non-empty pages until the engine runs out of hits, then a
    /// single empty batch with `end_of_stream` set. Calling again after the
    /// end keeps returning that empty batch without contacting the engine.
    ///
    /// A transient failure is retried with the same cursor token, so a
    /// successful retry neither repeats nor skips documents.
    ///
    /// # Errors
    ///
    /// * `ClientError::CursorExpired` - The server dropped the cursor; not retried
    /// * `ClientError::ScrollFailure` - A fetch kept failing after all retries
    /// * `ClientError::NotConnected` - The owning client disconnected
    pub async fn next_batch(&mut self) -> Result<ScrollBatch, ClientError> {
        if let Some(documents) = self.first_page.take() {
            return Ok(ScrollBatch::page(documents));
        }
        if self.finished {
            return Ok(ScrollBatch::end());
        }

        let Some(scroll_id) = self.cursor.clone() else {
            // The engine returned hits without a cursor; there is nothing to continue
            self.finished = true;
            return Ok(ScrollBatch::end());
        };

        if let Err(e) = self.connection.require_live("scroll") {
            self.finish().await;
            return Err(e);
        }

        let engine: &dyn SearchEngineClient = self.connection.engine().as_ref();
        let keep_alive = self.keep_alive;
        let id: &str = &scroll_id;

        match with_retry(&self.policy, "next_scroll", move || {
            engine.next_scroll(id, keep_alive)
        })
        .await
        {
            Ok(page) => {
                if let Some(next_id) = page.scroll_id {
                    self.cursor = Some(next_id);
                }

                if page.documents.is_empty() {
                    debug!("Scroll exhausted");
                    self.finish().await;
                    Ok(ScrollBatch::end())
                } else {
                    debug!(documents = page.documents.len(), "Scroll page fetched");
                    Ok(ScrollBatch::page(page.documents))
                }
            }
            Err(failure) => {
                self.finish().await;
                match failure.error {
                    SearchError::CursorExpired(msg) => {
                        warn!("Scroll cursor expired");
                        Err(ClientError::CursorExpired(msg))
                    }
                    error => {
                        warn!(attempts = failure.attempts, error = %error, "Scroll fetch failed");
                        Err(ClientError::ScrollFailure {
                            attempts: failure.attempts,
                            source: error,
                        })
                    }
                }
            }
        }
    }

    /// Release the server cursor and end the scroll.
    pub async fn close(mut self) {
        self.first_page = None;
        self.finish().await;
    }

    /// Drain every remaining page into memory.
    pub async fn collect_all(mut self) -> Result<Vec<Document>, ClientError> {
        let mut documents = Vec::new();
        loop {
            let batch = self.next_batch().await?;
            if batch.end_of_stream {
                return Ok(documents);
            }
            documents.extend(batch.documents);
        }
    }

    /// Adapt the reader into a stream of documents.
    ///
    /// The stream ends after the first error. Dropping the stream early
    /// releases the cursor.
    pub fn into_stream(self) -> impl Stream<Item = Result<Document, ClientError>> + Send {
        stream::try_unfold(self, |mut reader| async move {
            let batch = reader.next_batch().await?;
            if batch.end_of_stream {
                return Ok::<_, ClientError>(None);
            }
            let documents = stream::iter(
                batch
                    .documents
                    .into_iter()
                    .map(Ok::<Document, ClientError>),
            );
            Ok(Some((documents, reader)))
        })
        .try_flatten()
    }

    /// Mark the scroll finished and release the cursor if one is held.
    async fn finish(&mut self) {
        self.finished = true;
        if let Some(scroll_id) = self.cursor.take() {
            let engine = self.connection.engine();
            match tokio::time::timeout(self.policy.timeout, engine.clear_scroll(&scroll_id)).await
            {
                Ok(Ok(())) => debug!("Scroll cursor released"),
                Ok(Err(e)) => warn!(error = %e, "Failed to release scroll cursor"),
                Err(_) => warn!("Timed out releasing scroll cursor"),
            }
        }
    }
}

impl Drop for ScrollReader {
    fn drop(&mut self) {
        let Some(scroll_id) = self.cursor.take() else {
            return;
        };

        let engine: Arc<dyn SearchEngineClient> = Arc::clone(self.connection.engine());
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = engine.clear_scroll(&scroll_id).await {
                        warn!(error = %e, "Failed to release abandoned scroll cursor");
                    }
                });
            }
            Err(_) => {
                warn!("Scroll reader dropped outside a runtime; cursor will expire on the server");
            }
        }
    }
}

impl std::fmt::Debug for ScrollReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrollReader")
            .field("cursor", &self.cursor)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

//! Bulk writer.
//!
//! Splits documents into fixed-size chunks and submits each chunk as one
//! bulk request.

use tracing::{debug, error, info, instrument, warn};

use elastices_repository::{BulkItemStatus, SearchEngineClient};
use elastices_shared::{Document, WriteReport};

use crate::connection::Connection;
use crate::errors::ClientError;
use crate::retry::{with_retry, RetryPolicy};

/// Writer that indexes documents into the search engine in chunks.
///
/// The writer is responsible for:
/// - Chunking documents in input order
/// - Retrying a chunk on transient failures
/// - Recording the outcome of every document in a `WriteReport`
///
/// A chunk that still fails after its retries is recorded as failed and the
/// writer moves on to the next chunk. Chunks are not atomic with respect to
/// each other.
pub struct BulkWriter {
    connection: Connection,
    batch_size: usize,
    policy: RetryPolicy,
}

impl BulkWriter {
    /// Create a new writer. A zero batch size is treated as one.
    pub fn new(connection: Connection, batch_size: usize, policy: RetryPolicy) -> Self {
        Self {
            connection,
            batch_size: batch_size.max(1),
            policy,
        }
    }

    /// Number of documents per bulk request.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Index `documents` into `index`, attaching `routing` to every item.
    ///
    /// # Returns
    ///
    /// * `Ok(WriteReport)` - Per-document outcomes, including failures
    /// * `Err(ClientError::NotConnected)` - If the connection has been closed
    #[instrument(skip(self, documents), fields(count = documents.len(), batch_size = self.batch_size))]
    pub async fn write(
        &self,
        index: &str,
        documents: &[Document],
        routing: Option<&str>,
    ) -> Result<WriteReport, ClientError> {
        let engine: &dyn SearchEngineClient = self.connection.require_live("write")?.as_ref();
        let mut report = WriteReport::new();

        for (chunk_index, chunk) in documents.chunks(self.batch_size).enumerate() {
            debug!(chunk = chunk_index, size = chunk.len(), "Submitting chunk");

            let result = with_retry(&self.policy, "bulk_index", move || {
                engine.bulk_index(index, routing, chunk)
            })
            .await;

            match result {
                Ok(items) => Self::record_chunk(&mut report, chunk, items),
                Err(failure) => {
                    error!(
                        chunk = chunk_index,
                        size = chunk.len(),
                        attempts = failure.attempts,
                        error = %failure.error,
                        "Chunk failed after retries, continuing with next chunk"
                    );
                    report.record_chunk_failure(
                        chunk_index,
                        chunk.iter().map(document_id),
                        failure.attempts,
                        &failure.error.to_string(),
                    );
                }
            }
        }

        info!(
            index = %index,
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed,
            failed_chunks = report.failed_chunks.len(),
            "Bulk write completed"
        );

        Ok(report)
    }

    /// Match bulk response items to the chunk's documents.
    ///
    /// The engine answers items in request order. A document the response
    /// does not cover is counted as failed.
    fn record_chunk(report: &mut WriteReport, chunk: &[Document], items: Vec<BulkItemStatus>) {
        if items.len() != chunk.len() {
            warn!(
                expected = chunk.len(),
                received = items.len(),
                "Bulk response item count does not match request"
            );
        }

        let mut items = items.into_iter();
        for doc in chunk {
            match items.next() {
                Some(item) => {
                    let id = doc.id.clone().unwrap_or(item.id.clone());
                    if item.is_success() {
                        report.record_success(id);
                    } else {
                        let reason = item
                            .error
                            .unwrap_or_else(|| format!("rejected with status {}", item.status));
                        debug!(id = %id, reason = %reason, "Document rejected");
                        report.record_failure(id, reason);
                    }
                }
                None => report.record_failure(document_id(doc), "no status returned by engine"),
            }
        }
    }
}

fn document_id(doc: &Document) -> String {
    doc.id.clone().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(n: usize) -> Vec<Document> {
        (0..n)
            .map(|i| Document::new(i.to_string()).with_field("n", i as i64))
            .collect()
    }

    #[test]
    fn test_record_chunk_matches_items_in_order() {
        let chunk = docs(3);
        let items = vec![
            BulkItemStatus::accepted("0"),
            BulkItemStatus::rejected("1", 400, "mapper_parsing_exception"),
            BulkItemStatus::accepted("2"),
        ];

        let mut report = WriteReport::new();
        BulkWriter::record_chunk(&mut report, &chunk, items);

        assert_eq!(report.total, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failures(), vec![("1", "mapper_parsing_exception")]);
    }

    #[test]
    fn test_record_chunk_missing_items_fail() {
        let chunk = docs(2);
        let items = vec![BulkItemStatus::accepted("0")];

        let mut report = WriteReport::new();
        BulkWriter::record_chunk(&mut report, &chunk, items);

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failures(), vec![("1", "no status returned by engine")]);
    }

    #[test]
    fn test_rejection_without_reason() {
        let chunk = docs(1);
        let items = vec![BulkItemStatus {
            id: "0".to_string(),
            status: 409,
            error: None,
        }];

        let mut report = WriteReport::new();
        BulkWriter::record_chunk(&mut report, &chunk, items);

        assert_eq!(report.failures(), vec![("0", "rejected with status 409")]);
    }
}

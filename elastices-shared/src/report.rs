//! Bulk write reports.

use serde::{Deserialize, Serialize};

/// Result of writing a single document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentWriteResult {
    /// The document's `_id`.
    pub id: String,
    /// Whether the engine accepted the document.
    pub success: bool,
    /// Rejection or transport failure reason if the write failed.
    pub error: Option<String>,
}

/// A chunk that could not be submitted at all.
///
/// Every document of a failed chunk also appears as a failed
/// `DocumentWriteResult` in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkFailure {
    /// Zero-based chunk position in submission order.
    pub chunk: usize,
    /// Number of documents in the chunk.
    pub documents: usize,
    /// Number of submission attempts made.
    pub attempts: u32,
    /// The last error seen for the chunk.
    pub reason: String,
}

/// Summary of a bulk write containing aggregate counts and per-document results.
///
/// Partial failure is a normal outcome of a bulk write and is reported here
/// rather than raised as an error. Each document identifier appears at most
/// once in `results`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WriteReport {
    /// Total number of documents submitted.
    pub total: usize,
    /// Number of documents the engine accepted.
    pub succeeded: usize,
    /// Number of documents that were rejected or never delivered.
    pub failed: usize,
    /// Individual results in submission order.
    pub results: Vec<DocumentWriteResult>,
    /// Chunks abandoned after exhausting retries.
    pub failed_chunks: Vec<ChunkFailure>,
}

impl WriteReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted document.
    pub fn record_success(&mut self, id: impl Into<String>) {
        self.total += 1;
        self.succeeded += 1;
        self.results.push(DocumentWriteResult {
            id: id.into(),
            success: true,
            error: None,
        });
    }

    /// Record a failed document.
    pub fn record_failure(&mut self, id: impl Into<String>, reason: impl Into<String>) {
        self.total += 1;
        self.failed += 1;
        self.results.push(DocumentWriteResult {
            id: id.into(),
            success: false,
            error: Some(reason.into()),
        });
    }

    /// Record a chunk that was abandoned, failing every document in it.
    pub fn record_chunk_failure<I, S>(&mut self, chunk: usize, ids: I, attempts: u32, reason: &str)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut documents = 0;
        for id in ids {
            documents += 1;
            self.record_failure(id, reason);
        }
        self.failed_chunks.push(ChunkFailure {
            chunk,
            documents,
            attempts,
            reason: reason.to_string(),
        });
    }

    /// The `(id, reason)` pairs of every failed document.
    pub fn failures(&self) -> Vec<(&str, &str)> {
        self.results
            .iter()
            .filter(|r| !r.success)
            .map(|r| (r.id.as_str(), r.error.as_deref().unwrap_or("")))
            .collect()
    }

    /// True if every submitted document was accepted.
    pub fn is_complete_success(&self) -> bool {
        self.failed == 0
    }
}

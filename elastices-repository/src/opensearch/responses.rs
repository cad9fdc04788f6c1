//! OpenSearch response parsing.

use serde_json::Value;

use crate::errors::SearchError;
use crate::types::{BulkItemStatus, ScrollPage};
use elastices_shared::Document;

/// Parse a search or scroll response into a page of documents.
pub(crate) fn parse_scroll_page(body: &Value) -> Result<ScrollPage, SearchError> {
    let scroll_id = body
        .get("_scroll_id")
        .and_then(|id| id.as_str())
        .map(str::to_string);

    let hits = body
        .get("hits")
        .and_then(|h| h.get("hits"))
        .and_then(|h| h.as_array())
        .ok_or_else(|| SearchError::parse("Response is missing hits.hits"))?;

    let documents = hits.iter().map(parse_hit).collect::<Result<Vec<_>, _>>()?;

    Ok(ScrollPage {
        scroll_id,
        documents,
    })
}

/// Parse a single hit into a document.
fn parse_hit(hit: &Value) -> Result<Document, SearchError> {
    let id = hit.get("_id").and_then(|id| id.as_str()).map(str::to_string);
    match hit.get("_source") {
        Some(Value::Object(source)) => Ok(Document::from_source(id, source)),
        // Hits without a source (e.g., `_source: false`) carry no fields
        None => Ok(Document {
            id,
            ..Default::default()
        }),
        Some(other) => Err(SearchError::parse(format!(
            "Hit _source is not an object: {}",
            other
        ))),
    }
}

/// Parse the per-item statuses of a bulk response.
pub(crate) fn parse_bulk_items(body: &Value) -> Result<Vec<BulkItemStatus>, SearchError> {
    let items = body
        .get("items")
        .and_then(|i| i.as_array())
        .ok_or_else(|| SearchError::parse("Bulk response is missing items"))?;

    items
        .iter()
        .map(|item| {
            // Each item is keyed by its action name ("index", "create", ...)
            let result = item
                .as_object()
                .and_then(|obj| obj.values().next())
                .ok_or_else(|| SearchError::parse(format!("Malformed bulk item: {}", item)))?;

            let id = result
                .get("_id")
                .and_then(|id| id.as_str())
                .unwrap_or_default()
                .to_string();
            let status = result
                .get("status")
                .and_then(|s| s.as_u64())
                .and_then(|s| u16::try_from(s).ok())
                .unwrap_or(500);
            let error = result.get("error").map(describe_item_error);

            Ok(BulkItemStatus { id, status, error })
        })
        .collect()
}

/// Render a bulk item error as `type: reason`.
fn describe_item_error(error: &Value) -> String {
    let kind = error.get("type").and_then(|t| t.as_str());
    let reason = error.get("reason").and_then(|r| r.as_str());
    match (kind, reason) {
        (Some(kind), Some(reason)) => format!("{}: {}", kind, reason),
        (Some(kind), None) => kind.to_string(),
        (None, Some(reason)) => reason.to_string(),
        (None, None) => error.to_string(),
    }
}

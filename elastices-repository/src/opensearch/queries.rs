//! OpenSearch request body builders.

use serde_json::{json, Map, Value};

use elastices_shared::Document;

/// A query matching every document.
pub fn match_all_query() -> Value {
    json!({ "query": { "match_all": {} } })
}

/// Build the lines of a bulk index request.
///
/// Each document contributes an action line followed by its source. Documents
/// without an id let the engine assign one.
pub(crate) fn build_bulk_lines(
    index: &str,
    routing: Option<&str>,
    documents: &[Document],
) -> Vec<Value> {
    let mut body = Vec::with_capacity(documents.len() * 2);

    for doc in documents {
        let mut action = Map::new();
        action.insert("_index".to_string(), json!(index));
        if let Some(id) = &doc.id {
            action.insert("_id".to_string(), json!(id));
        }
        if let Some(routing) = routing {
            action.insert("routing".to_string(), json!(routing));
        }

        body.push(json!({ "index": action }));
        body.push(doc.to_source());
    }

    body
}

/// Body of a scroll continuation request.
pub(crate) fn build_scroll_body(scroll_id: &str, keep_alive: &str) -> Value {
    json!({
        "scroll": keep_alive,
        "scroll_id": scroll_id
    })
}

/// Body of a clear-scroll request.
pub(crate) fn build_clear_scroll_body(scroll_id: &str) -> Value {
    json!({ "scroll_id": [scroll_id] })
}

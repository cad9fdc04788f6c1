//! Engine documents.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::value::ScalarValue;

/// A document as stored in the search index.
///
/// Fields are kept in a `BTreeMap`, so a document always serializes with its
/// field names in lexicographic order regardless of how it was built.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    /// The engine `_id`. Set for documents built from a table and for
    /// documents read back from the engine.
    pub id: Option<String>,
    /// The document source fields.
    pub fields: BTreeMap<String, ScalarValue>,
}

impl Document {
    /// Create an empty document with the given identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            fields: BTreeMap::new(),
        }
    }

    /// Add a field, returning the document.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Look up a field value.
    pub fn get(&self, name: &str) -> Option<&ScalarValue> {
        self.fields.get(name)
    }

    /// Build a document from an engine `_source` object.
    pub fn from_source(id: Option<String>, source: &Map<String, Value>) -> Self {
        let fields = source
            .iter()
            .map(|(name, value)| (name.clone(), ScalarValue::from_json(value)))
            .collect();
        Self { id, fields }
    }

    /// Render the document fields as an engine `_source` object.
    pub fn to_source(&self) -> Value {
        let source: Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        Value::Object(source)
    }
}

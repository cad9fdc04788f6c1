//! Conversion between tables and engine documents.
//!
//! Document fields are always emitted in lexicographic column order, whatever
//! the input column order, so that the same table produces byte-identical
//! request bodies.

use std::collections::{BTreeSet, HashSet};

use elastices_shared::{Column, Document, ScalarValue, Table};

use crate::errors::ClientError;

/// Convert each row of `table` into a document keyed by `identifier_column`.
///
/// The identifier column stays in the document source as well. Every check
/// runs before any document is returned, so a bad table never reaches the
/// engine.
///
/// # Errors
///
/// * `ClientError::Schema` - If the identifier column is missing or holds a null
/// * `ClientError::DuplicateIdentifier` - If two rows share an identifier
pub fn rows_to_documents(
    table: &Table,
    identifier_column: &str,
) -> Result<Vec<Document>, ClientError> {
    let id_column = table.column(identifier_column).ok_or_else(|| {
        ClientError::schema(format!(
            "identifier column '{}' is not one of {:?}",
            identifier_column,
            table.column_names()
        ))
    })?;

    let mut seen = HashSet::with_capacity(table.num_rows());
    let mut ids = Vec::with_capacity(table.num_rows());
    for (row, value) in id_column.values.iter().enumerate() {
        let id = value.as_identifier().ok_or_else(|| {
            ClientError::schema(format!(
                "identifier column '{}' is null at row {}",
                identifier_column, row
            ))
        })?;
        if !seen.insert(id.clone()) {
            return Err(ClientError::DuplicateIdentifier {
                column: identifier_column.to_string(),
                id,
            });
        }
        ids.push(id);
    }

    let documents = ids
        .into_iter()
        .enumerate()
        .map(|(row, id)| Document {
            id: Some(id),
            fields: table
                .row(row)
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect(),
        })
        .collect();

    Ok(documents)
}

/// Assemble documents into a table.
///
/// Columns are the union of every document's field names, sorted by name.
/// A document missing a field gets a null cell. Document ids are not added
/// as a column; the identifier is expected to live in the source.
///
/// Documents carry no schema, so columns come only from fields actually
/// present. No documents yields a table with no columns, even when the rows
/// were produced from a table that had columns but no rows.
pub fn documents_to_table(documents: &[Document]) -> Result<Table, ClientError> {
    let names: BTreeSet<&str> = documents
        .iter()
        .flat_map(|doc| doc.fields.keys().map(String::as_str))
        .collect();

    let columns = names
        .into_iter()
        .map(|name| Column {
            name: name.to_string(),
            values: documents
                .iter()
                .map(|doc| doc.get(name).cloned().unwrap_or(ScalarValue::Null))
                .collect(),
        })
        .collect();

    Ok(Table::new(columns)?)
}

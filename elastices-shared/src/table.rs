//! Column-oriented tables.
//!
//! A `Table` is an ordered list of named columns of equal length. Tables are
//! the unit the loader writes to and reads from the search engine.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::ScalarValue;

/// Errors raised when constructing a malformed table.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    /// A column's length differs from the first column's length.
    #[error("Column '{column}' has {actual} values, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// Two columns share a name.
    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),

    /// A row has a different number of cells than there are columns.
    #[error("Row {row} has {actual} cells, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

/// A named column of scalar values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name, used as the document field name.
    pub name: String,
    /// Cell values, one per row.
    pub values: Vec<ScalarValue>,
}

impl Column {
    /// Create a column from a name and any values convertible to scalars.
    pub fn new<V: Into<ScalarValue>>(name: impl Into<String>, values: Vec<V>) -> Self {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// An ordered collection of equal-length named columns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    /// Build a table, checking that column names are unique and that every
    /// column has the same number of values.
    pub fn new(columns: Vec<Column>) -> Result<Self, TableError> {
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(TableError::DuplicateColumn(column.name.clone()));
            }
        }

        if let Some(first) = columns.first() {
            let expected = first.values.len();
            for column in &columns[1..] {
                if column.values.len() != expected {
                    return Err(TableError::RaggedColumn {
                        column: column.name.clone(),
                        expected,
                        actual: column.values.len(),
                    });
                }
            }
        }

        Ok(Self { columns })
    }

    /// Build a table from a header and row-major cells.
    pub fn from_rows(
        names: Vec<String>,
        rows: Vec<Vec<ScalarValue>>,
    ) -> Result<Self, TableError> {
        let mut columns: Vec<Column> = names
            .into_iter()
            .map(|name| Column {
                name,
                values: Vec::with_capacity(rows.len()),
            })
            .collect();

        for (row_index, row) in rows.into_iter().enumerate() {
            if row.len() != columns.len() {
                return Err(TableError::RowWidth {
                    row: row_index,
                    expected: columns.len(),
                    actual: row.len(),
                });
            }
            for (column, cell) in columns.iter_mut().zip(row) {
                column.values.push(cell);
            }
        }

        Self::new(columns)
    }

    /// Create a table with no columns and no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|c| c.values.len()).unwrap_or(0)
    }

    /// Number of columns.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// True if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    /// Columns in their current order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in their current order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Return a copy of this table with columns sorted by name.
    pub fn sorted_by_name(&self) -> Self {
        let mut columns = self.columns.clone();
        columns.sort_by(|a, b| a.name.cmp(&b.name));
        Self { columns }
    }

    /// Iterate over the cells of one row as `(column name, value)` pairs.
    ///
    /// Yields nothing if `index` is out of range.
    pub fn row(&self, index: usize) -> impl Iterator<Item = (&str, &ScalarValue)> {
        self.columns.iter().filter_map(move |column| {
            column
                .values
                .get(index)
                .map(|value| (column.name.as_str(), value))
        })
    }

    /// Compare two tables, ignoring the order of their columns.
    pub fn eq_ignoring_column_order(&self, other: &Table) -> bool {
        self.sorted_by_name() == other.sorted_by_name()
    }
}

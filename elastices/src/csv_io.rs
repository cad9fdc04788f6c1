//! CSV table I/O.
//!
//! Reads a CSV file with a header row into a [`Table`], inferring a scalar
//! type per cell, and writes a table back out as CSV.

use std::io::{Read, Write};

use csv::{ReaderBuilder, WriterBuilder};
use thiserror::Error;

use elastices_shared::{ScalarValue, Table, TableError};

#[derive(Error, Debug)]
pub enum CsvIoError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Table error: {0}")]
    Table(#[from] TableError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read a CSV document with a header row into a table.
///
/// Every record must have as many fields as the header.
pub fn read_table<R: Read>(reader: R) -> Result<Table, CsvIoError> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);

    let names: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(record.iter().map(infer_scalar).collect());
    }

    Ok(Table::from_rows(names, rows)?)
}

/// Write a table as CSV with a header row. Nulls are written as empty fields.
pub fn write_table<W: Write>(table: &Table, writer: W) -> Result<(), CsvIoError> {
    let mut wtr = WriterBuilder::new().from_writer(writer);

    wtr.write_record(table.column_names())?;
    for row in 0..table.num_rows() {
        wtr.write_record(table.row(row).map(|(_, value)| format_cell(value)))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Render a cell so that [`infer_scalar`] reads it back as the same type.
///
/// Floats always carry a fraction or exponent (`8.0`, not `8`).
pub fn format_cell(value: &ScalarValue) -> String {
    match value {
        ScalarValue::Float(f) => format!("{:?}", f),
        other => other.to_string(),
    }
}

/// Infer a scalar from a raw CSV field.
///
/// Empty is null, `true`/`false` are booleans, then integer, then finite
/// float. Anything else is kept as text.
pub fn infer_scalar(raw: &str) -> ScalarValue {
    if raw.is_empty() {
        return ScalarValue::Null;
    }
    match raw {
        "true" => return ScalarValue::Bool(true),
        "false" => return ScalarValue::Bool(false),
        _ => {}
    }
    if let Ok(i) = raw.parse::<i64>() {
        return ScalarValue::Int(i);
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() => ScalarValue::Float(f),
        _ => ScalarValue::Text(raw.to_string()),
    }
}

//! # Elastices Shared
//!
//! Plain data types shared by the repository and the loader: scalar cell
//! values, column-oriented tables, engine documents and bulk write reports.
//! Nothing in this crate performs I/O.

pub mod document;
pub mod report;
pub mod table;
pub mod value;

pub use document::Document;
pub use report::{ChunkFailure, DocumentWriteResult, WriteReport};
pub use table::{Column, Table, TableError};
pub use value::ScalarValue;

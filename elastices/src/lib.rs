//! # Elastices
//!
//! Bulk table loader and scroll exporter for OpenSearch.
//!
//! This crate composes the engine client from `elastices-repository` into
//! four operations: scroll a query, read a query into a table, write a table
//! as documents, and truncate an index. The [`Client`] façade owns the
//! connection lifecycle; the building blocks ([`ScrollReader`],
//! [`BulkWriter`], [`IndexManager`] and the [`codec`] functions) can also be
//! used directly on a [`Connection`].

pub mod bulk;
pub mod client;
pub mod codec;
pub mod connection;
pub mod csv_io;
pub mod errors;
pub mod index;
pub mod retry;
pub mod scroll;

pub use bulk::BulkWriter;
pub use client::Client;
pub use connection::Connection;
pub use errors::ClientError;
pub use index::IndexManager;
pub use retry::RetryPolicy;
pub use scroll::{ScrollBatch, ScrollReader};

pub use elastices_repository::{ConnectionConfig, SearchError};
pub use elastices_shared::{Column, Document, ScalarValue, Table, WriteReport};

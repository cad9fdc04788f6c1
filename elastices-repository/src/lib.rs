//! # Elastices Repository
//!
//! This crate provides the boundary between the loader and the search engine.
//! It includes connection configuration, error definitions, the
//! `SearchEngineClient` capability trait, and a concrete implementation for
//! OpenSearch.

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod types;

pub use config::ConnectionConfig;
pub use errors::SearchError;
pub use interfaces::{Connector, SearchEngineClient};
pub use opensearch::{OpenSearchClient, OpenSearchConnector};
pub use types::{BulkItemStatus, ScrollPage, ScrollRequest};

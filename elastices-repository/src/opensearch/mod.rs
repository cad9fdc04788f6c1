//! OpenSearch implementation of the search engine client.
//!
//! This module provides a concrete implementation of `SearchEngineClient`
//! and `Connector` using OpenSearch as the backend.

mod client;
mod queries;
mod responses;

pub use client::{OpenSearchClient, OpenSearchConnector};
pub use queries::match_all_query;

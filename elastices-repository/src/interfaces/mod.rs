//! Interface definitions for the search engine client.
//!
//! This module defines the abstract `SearchEngineClient` trait and the
//! `Connector` that produces clients, allowing for dependency injection and
//! swappable search backend implementations.

mod connector;
mod search_engine_client;

pub use connector::Connector;
pub use search_engine_client::SearchEngineClient;

//! Error types for the elastices repository.

mod search_error;

pub use search_error::SearchError;

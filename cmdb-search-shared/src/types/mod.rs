//! Core data structures shared by the indexer and the repository.

pub mod properties;
pub mod search_document;

pub use properties::DataKind;
pub use search_document::SearchDocument;

//! # CMDB Search Repository
//!
//! This crate provides the index catalog, the traits for interacting with the
//! search index, and implementations for OpenSearch and for process memory.

pub mod catalog;
pub mod errors;
pub mod interfaces;
pub mod memory;
pub mod opensearch;
pub mod types;
pub mod utils;

pub use catalog::{IndexCatalog, IndexDefinition, IndexKind, IndexSettings};
pub use errors::SearchIndexError;
pub use interfaces::SearchIndexProvider;
pub use memory::InMemoryProvider;
pub use opensearch::OpenSearchProvider;
pub use types::{
    DeleteDocumentRequest, TableRowDeleteRequest, TableRowUpdateRequest, UpsertDocumentRequest,
};

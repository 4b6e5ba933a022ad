//! # CMDB Search Shared
//!
//! Shared data structures used across the CMDB search indexer crates.
//! It includes the search document written for every indexed record and the
//! names of the index properties those documents carry.

pub mod types;

pub use types::properties::{self, DataKind};
pub use types::search_document::SearchDocument;

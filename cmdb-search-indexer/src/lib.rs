//! # CMDB Search Indexer
//!
//! Indexing layer between the configuration database and OpenSearch. A host
//! runtime tails the database's change stream and hands every change event
//! to the [`Dispatcher`]; the dispatcher answers with what to write into the
//! search engine.
//!
//! ## Architecture
//!
//! 1. **Bootstrap**: Reconciles indices and aliases, fills the caches and
//!    starts their refresh loops
//! 2. **Dispatcher**: Routes each change event to the transformer of its
//!    collection
//! 3. **Transformers**: Turn a record into a search document (or a table-row
//!    update)
//! 4. **Loader**: Applies the outcomes to the search engine
//!
//! ## Modules
//!
//! - [`bootstrap`]: Startup of the indexing layer
//! - [`cache`]: Enum label and resource-pool exclusion caches
//! - [`collections`]: Collection names and their classification
//! - [`config`]: Settings file and dependency initialization
//! - [`dispatcher`]: Change events and their routing
//! - [`keywords`] and [`sanitizer`]: Keyword extraction
//! - [`loader`]: Applies outcomes to the search index
//! - [`runner`]: Event stream runner used by the binary
//! - [`store`]: Read access to the configuration database
//! - [`transformer`]: Per-family transformers
//! - [`errors`]: Error types for the indexer

pub mod bootstrap;
pub mod cache;
pub mod collections;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod identity;
pub mod keywords;
pub mod loader;
pub mod outcome;
pub mod runner;
pub mod sanitizer;
pub mod store;
pub mod transformer;

pub use bootstrap::{init, Bootstrapped, InitContext};
pub use config::{Dependencies, Settings};
pub use dispatcher::{ChangeEvent, Dispatcher, Operation};
pub use errors::{CacheError, ConfigError, IngestError, MapError, StoreError};
pub use loader::SearchLoader;
pub use outcome::{DropReason, MapOutcome};
pub use runner::{EventRunner, RunStats};
pub use store::{ConfigStore, InMemoryStore};

use cmdb_search_repository::SearchIndexError;
use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The settings file is missing or invalid.
    #[error("Settings error: {0}")]
    Settings(#[from] ConfigError),

    /// An index, alias or mapping could not be reconciled.
    #[error("Search index error: {0}")]
    SearchIndex(#[from] SearchIndexError),

    /// A startup cache rebuild failed.
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Ingest error.
    #[error("Ingest error: {0}")]
    IngestError(#[from] IngestError),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}

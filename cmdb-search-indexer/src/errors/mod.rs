//! Error types for the CMDB search indexer.

use thiserror::Error;

/// Errors raised while turning one change event into an outcome.
///
/// These are per-event failures: the host runtime logs them and moves on.
#[derive(Error, Debug)]
pub enum MapError {
    /// The identifying field of the record is missing or null.
    #[error("Missing field: {0}")]
    MissingField(String),

    /// The record carries no usable primary-store id.
    #[error("Missing document metadata id")]
    MissingPrimaryId,

    /// The business id of a business or set record is not an integer.
    #[error("Invalid business id: {0}")]
    InvalidBizId(String),

    /// A table-property collection name could not be parsed.
    #[error("Invalid table property collection: {0}")]
    InvalidCollection(String),

    /// The model row behind a model or attribute event does not exist.
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Reading the primary store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The search document could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MapError {
    /// Create a missing field error.
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField(field.into())
    }
}

/// Errors returned by a `ConfigStore`.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The query failed.
    #[error("Query error: {0}")]
    Query(String),
}

impl StoreError {
    /// Create a query error.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }
}

/// Errors raised while rebuilding a cache snapshot.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Reading the primary store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The exclusion query returned no resource-pool business.
    #[error("Resource pool query returned no business")]
    EmptyExclusionSet,
}

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML.
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A required key is missing.
    #[error("Missing configuration key: {0}")]
    Missing(&'static str),

    /// A key holds an unusable value.
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Errors that can occur while applying outcomes to the search index.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Error from the search index provider.
    #[error("Search index error: {0}")]
    SearchIndex(#[from] cmdb_search_repository::SearchIndexError),

    /// Error from the primary store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The instance owning a table row does not exist in the primary store.
    #[error("Owner of table row not found: {collection}.{id_field}={instance_id}")]
    OwnerNotFound {
        collection: String,
        id_field: &'static str,
        instance_id: i64,
    },

    /// Error resolving the owning document of a table row.
    #[error("Map error: {0}")]
    Map(#[from] MapError),

    /// A line of the event stream is not a change event.
    #[error("Invalid change event on line {line}: {source}")]
    Decode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// Reading the event stream failed.
    #[error("Event stream error: {0}")]
    Io(#[from] std::io::Error),
}

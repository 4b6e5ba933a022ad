//! Dependency initialization and wiring for the indexer binary.

use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use super::Settings;
use crate::IndexingError;
use cmdb_search_repository::{IndexKind, OpenSearchProvider, SearchIndexProvider};

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default connection retry interval in seconds.
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;

/// Connection mode for OpenSearch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Fail immediately if connection fails.
    FailFast,
    /// Retry connection every retry interval until successful.
    Retry,
}

impl ConnectionMode {
    /// Parse a connection mode.
    ///
    /// Valid values: "fail-fast" or "retry" (case-insensitive).
    /// Defaults to "retry" if invalid.
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "fail-fast" | "failfast" | "fail_fast" => Self::FailFast,
            "retry" => Self::Retry,
            _ => {
                warn!(value = %value, "Invalid OPENSEARCH_CONNECTION_MODE, defaulting to 'retry'");
                Self::Retry
            }
        }
    }

    fn from_env() -> Self {
        Self::parse(&env::var("OPENSEARCH_CONNECTION_MODE").unwrap_or_else(|_| "retry".to_string()))
    }
}

/// Container for all initialized dependencies.
pub struct Dependencies {
    pub settings: Settings,
    pub provider: Arc<dyn SearchIndexProvider>,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables and the
    /// settings file.
    ///
    /// # Environment Variables
    ///
    /// - `CMDB_SEARCH_CONFIG`: Settings file (default: ./etc/extra.toml)
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `OPENSEARCH_CONNECTION_MODE`: Connection mode - "fail-fast" or "retry" (default: retry)
    /// - `OPENSEARCH_RETRY_INTERVAL_SECS`: Retry interval in seconds (default: 15)
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If the settings are invalid, or the
    ///   connection fails in fail-fast mode
    pub async fn new() -> Result<Self, IndexingError> {
        let settings = Settings::load_default()?;

        let opensearch_url =
            env::var("OPENSEARCH_URL").unwrap_or_else(|_| DEFAULT_OPENSEARCH_URL.to_string());
        let connection_mode = ConnectionMode::from_env();
        let retry_interval = env::var("OPENSEARCH_RETRY_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_INTERVAL_SECS);

        info!(
            opensearch_url = %opensearch_url,
            connection_mode = ?connection_mode,
            retry_interval_secs = retry_interval,
            shards = settings.shards,
            replicas = settings.replicas,
            database = %settings.database,
            "Initializing dependencies"
        );

        let provider = Self::connect_to_opensearch(
            &opensearch_url,
            connection_mode,
            Duration::from_secs(retry_interval),
        )
        .await?;

        info!("OpenSearch connection established");

        Ok(Self {
            settings,
            provider: Arc::new(provider),
        })
    }

    /// Connect to OpenSearch with retry logic based on connection mode.
    ///
    /// Creating the client does not reach the server, so the connection is
    /// checked with a request for the first managed alias.
    async fn connect_to_opensearch(
        url: &str,
        mode: ConnectionMode,
        retry_interval: Duration,
    ) -> Result<OpenSearchProvider, IndexingError> {
        loop {
            match Self::try_connect_opensearch(url).await {
                Ok(provider) => return Ok(provider),
                Err(e) => match mode {
                    ConnectionMode::FailFast => {
                        return Err(IndexingError::config(format!(
                            "Failed to connect to OpenSearch: {}",
                            e
                        )));
                    }
                    ConnectionMode::Retry => {
                        warn!(
                            opensearch_url = %url,
                            error = %e,
                            retry_interval_secs = retry_interval.as_secs(),
                            "Failed to connect to OpenSearch, retrying..."
                        );
                        sleep(retry_interval).await;
                    }
                },
            }
        }
    }

    /// Attempt to connect to OpenSearch.
    async fn try_connect_opensearch(url: &str) -> Result<OpenSearchProvider, IndexingError> {
        let provider = OpenSearchProvider::new(url).await?;
        provider
            .alias_targets(IndexKind::ALL[0].base_name())
            .await?;
        Ok(provider)
    }
}

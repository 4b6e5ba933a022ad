//! Indexer settings file.
//!
//! ```toml
//! elasticsearch-shard-num = "1"
//! elasticsearch-replica-num = "1"
//! database = "cmdb"
//! refresh-interval-secs = 60
//! ```

use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use cmdb_search_repository::IndexSettings;
use serde::Deserialize;

use crate::errors::ConfigError;

/// Default location of the settings file.
pub const DEFAULT_CONFIG_PATH: &str = "./etc/extra.toml";

/// Environment variable overriding [`DEFAULT_CONFIG_PATH`].
pub const CONFIG_PATH_ENV: &str = "CMDB_SEARCH_CONFIG";

const DEFAULT_DATABASE: &str = "cmdb";
const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 60;

const SHARD_NUM_KEY: &str = "elasticsearch-shard-num";
const REPLICA_NUM_KEY: &str = "elasticsearch-replica-num";

/// A count written either as a string or as an integer.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Count {
    Number(i64),
    Text(String),
}

impl Count {
    fn parse(&self, key: &'static str) -> Result<u32, ConfigError> {
        let parsed = match self {
            Count::Number(n) => u32::try_from(*n).ok(),
            Count::Text(s) => s.trim().parse().ok(),
        };
        parsed.ok_or_else(|| ConfigError::Invalid {
            key,
            value: match self {
                Count::Number(n) => n.to_string(),
                Count::Text(s) => s.clone(),
            },
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawSettings {
    elasticsearch_shard_num: Option<Count>,
    elasticsearch_replica_num: Option<Count>,
    database: Option<String>,
    refresh_interval_secs: Option<u64>,
}

/// Validated indexer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Primary shards of every managed index.
    pub shards: u32,
    /// Replicas of every managed index.
    pub replicas: u32,
    /// Database holding the configuration collections read by the caches.
    pub database: String,
    /// Period of the cache refresh loops.
    pub refresh_interval: Duration,
}

impl Settings {
    /// Parse settings from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let raw: RawSettings = toml::from_str(text)?;

        let shards = raw
            .elasticsearch_shard_num
            .ok_or(ConfigError::Missing(SHARD_NUM_KEY))?
            .parse(SHARD_NUM_KEY)?;
        if shards == 0 {
            return Err(ConfigError::Invalid {
                key: SHARD_NUM_KEY,
                value: "0".to_string(),
            });
        }
        let replicas = raw
            .elasticsearch_replica_num
            .ok_or(ConfigError::Missing(REPLICA_NUM_KEY))?
            .parse(REPLICA_NUM_KEY)?;

        let database = raw
            .database
            .filter(|db| !db.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());
        let refresh_interval = Duration::from_secs(
            raw.refresh_interval_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_REFRESH_INTERVAL_SECS),
        );

        Ok(Self {
            shards,
            replicas,
            database,
            refresh_interval,
        })
    }

    /// Read and parse a settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Load the file named by `CMDB_SEARCH_CONFIG`, or the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load(path)
    }

    pub fn index_settings(&self) -> IndexSettings {
        IndexSettings::new(self.shards, self.replicas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_counts() {
        let settings = Settings::from_toml_str(
            r#"
            elasticsearch-shard-num = "3"
            elasticsearch-replica-num = "1"
            "#,
        )
        .unwrap();

        assert_eq!(settings.index_settings(), IndexSettings::new(3, 1));
        assert_eq!(settings.database, "cmdb");
        assert_eq!(settings.refresh_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_integer_counts_and_overrides() {
        let settings = Settings::from_toml_str(
            r#"
            elasticsearch-shard-num = 2
            elasticsearch-replica-num = 0
            database = "cmdb_test"
            refresh-interval-secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(settings.shards, 2);
        assert_eq!(settings.replicas, 0);
        assert_eq!(settings.database, "cmdb_test");
        assert_eq!(settings.refresh_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_missing_counts() {
        let result = Settings::from_toml_str(r#"elasticsearch-replica-num = 1"#);
        assert!(matches!(
            result,
            Err(ConfigError::Missing("elasticsearch-shard-num"))
        ));

        let result = Settings::from_toml_str(r#"elasticsearch-shard-num = 1"#);
        assert!(matches!(
            result,
            Err(ConfigError::Missing("elasticsearch-replica-num"))
        ));
    }

    #[test]
    fn test_invalid_counts() {
        for text in [
            "elasticsearch-shard-num = \"many\"\nelasticsearch-replica-num = 1",
            "elasticsearch-shard-num = 0\nelasticsearch-replica-num = 1",
            "elasticsearch-shard-num = 1\nelasticsearch-replica-num = -1",
        ] {
            assert!(
                matches!(Settings::from_toml_str(text), Err(ConfigError::Invalid { .. })),
                "accepted {}",
                text
            );
        }
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            Settings::from_toml_str("elasticsearch-shard-num = "),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Settings::load("/nonexistent/extra.toml"),
            Err(ConfigError::Io { .. })
        ));
    }
}

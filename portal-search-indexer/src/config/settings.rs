//! Settings read from environment variables.

use std::env;
use std::time::Duration;

use tracing::warn;

use crate::consumer::ENTITY_CHANGES_TOPIC;
use crate::processor::FailurePolicy;

/// Default PostgreSQL URL of the portal database.
const DEFAULT_DATABASE_URL: &str = "postgres://localhost/tardis";

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default prefix of the per-kind index aliases.
const DEFAULT_INDEX_ALIAS_PREFIX: &str = "tardis";

/// Default Kafka broker address.
const DEFAULT_KAFKA_BROKER: &str = "localhost:9092";

/// Default Kafka consumer group ID.
const DEFAULT_KAFKA_GROUP_ID: &str = "portal-search-indexer";

/// Default connection retry interval in seconds.
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;

/// Default number of documents per bulk request.
const DEFAULT_LOADER_BATCH_SIZE: usize = 100;

/// Connection mode for OpenSearch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Fail immediately if connection fails.
    FailFast,
    /// Retry the connection until it succeeds.
    Retry,
}

impl ConnectionMode {
    /// Parse a connection mode. Valid values are "fail-fast" and "retry"
    /// (case-insensitive); anything else falls back to retry.
    fn parse(value: Option<String>) -> Self {
        match value
            .unwrap_or_else(|| "retry".to_string())
            .to_lowercase()
            .as_str()
        {
            "fail-fast" | "failfast" | "fail_fast" => Self::FailFast,
            "retry" => Self::Retry,
            _ => {
                warn!("Invalid OPENSEARCH_CONNECTION_MODE, defaulting to 'retry'");
                Self::Retry
            }
        }
    }
}

/// Indexer settings.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: Portal database URL (default: postgres://localhost/tardis)
/// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
/// - `INDEX_ALIAS_PREFIX`: Prefix of the per-kind index aliases (default: tardis)
/// - `INDEX_VERSION`: Index version number (default: 0)
/// - `OPENSEARCH_CONNECTION_MODE`: "fail-fast" or "retry" (default: retry)
/// - `OPENSEARCH_RETRY_INTERVAL_SECS`: Retry interval in seconds (default: 15)
/// - `KAFKA_BROKER`: Kafka broker address (default: localhost:9092)
/// - `KAFKA_GROUP_ID`: Consumer group ID (default: portal-search-indexer)
/// - `KAFKA_TOPIC`: Entity change topic (default: portal.entity-changes)
/// - `ASSEMBLY_FAILURE_POLICY`: "skip" or "abort" (default: skip)
/// - `SCHEMA_REFRESH_INTERVAL_SECS`: Catalog reload period, 0 disables (default: 0)
/// - `REINDEX_ON_STARTUP`: Re-index every entity before consuming (default: false)
/// - `LOADER_BATCH_SIZE`: Documents per bulk request (default: 100)
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub database_url: String,
    pub opensearch_url: String,
    pub index_alias_prefix: String,
    pub index_version: u32,
    pub connection_mode: ConnectionMode,
    pub retry_interval: Duration,
    pub kafka_broker: String,
    pub kafka_group_id: String,
    pub kafka_topic: String,
    pub failure_policy: FailurePolicy,
    pub schema_refresh_interval: Option<Duration>,
    pub reindex_on_startup: bool,
    pub loader_batch_size: usize,
}

impl Settings {
    /// Read the settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read the settings through `lookup`, falling back to defaults for missing or
    /// malformed values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let failure_policy = match lookup("ASSEMBLY_FAILURE_POLICY") {
            Some(value) => value.parse().unwrap_or_else(|e: String| {
                warn!(error = %e, "Invalid ASSEMBLY_FAILURE_POLICY, defaulting to 'skip'");
                FailurePolicy::Skip
            }),
            None => FailurePolicy::Skip,
        };

        let refresh_secs: u64 = parse_or(&lookup, "SCHEMA_REFRESH_INTERVAL_SECS", 0);

        Self {
            database_url: string("DATABASE_URL", DEFAULT_DATABASE_URL),
            opensearch_url: string("OPENSEARCH_URL", DEFAULT_OPENSEARCH_URL),
            index_alias_prefix: string("INDEX_ALIAS_PREFIX", DEFAULT_INDEX_ALIAS_PREFIX),
            index_version: parse_or(&lookup, "INDEX_VERSION", 0),
            connection_mode: ConnectionMode::parse(lookup("OPENSEARCH_CONNECTION_MODE")),
            retry_interval: Duration::from_secs(parse_or(
                &lookup,
                "OPENSEARCH_RETRY_INTERVAL_SECS",
                DEFAULT_RETRY_INTERVAL_SECS,
            )),
            kafka_broker: string("KAFKA_BROKER", DEFAULT_KAFKA_BROKER),
            kafka_group_id: string("KAFKA_GROUP_ID", DEFAULT_KAFKA_GROUP_ID),
            kafka_topic: string("KAFKA_TOPIC", ENTITY_CHANGES_TOPIC),
            failure_policy,
            schema_refresh_interval: (refresh_secs > 0).then(|| Duration::from_secs(refresh_secs)),
            reindex_on_startup: parse_or(&lookup, "REINDEX_ON_STARTUP", false),
            loader_batch_size: parse_or(&lookup, "LOADER_BATCH_SIZE", DEFAULT_LOADER_BATCH_SIZE)
                .max(1),
        }
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match lookup(key) {
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            warn!(key = key, value = %value, "Invalid value, using default");
            default
        }),
        None => default,
    }
}

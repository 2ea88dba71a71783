//! Dependency initialization and wiring for the search indexer.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::assembler::AssemblerRegistry;
use crate::catalog::ParameterCatalog;
use crate::config::{ConnectionMode, Settings};
use crate::consumer::KafkaConsumer;
use crate::loader::{LoaderConfig, SearchLoader};
use crate::orchestrator::{Orchestrator, OrchestratorConfig};
use crate::processor::EntityProcessor;
use crate::schema::SchemaRegistry;
use crate::IndexingError;
use portal_search_repository::opensearch::IndexConfig;
use portal_search_repository::{OpenSearchProvider, PostgresStore};

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
    /// The portal database, for full re-indexes.
    pub store: Arc<PostgresStore>,
    pub settings: Settings,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// See [`Settings`] for the variables read. The portal database is connected
    /// lazily: an unreachable or unmigrated database leaves the schemas with their
    /// fixed fields only instead of failing startup.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If initialization fails (OpenSearch only in fail-fast mode)
    pub async fn new() -> Result<Self, IndexingError> {
        let settings = Settings::from_env();

        info!(
            opensearch_url = %settings.opensearch_url,
            index_alias_prefix = %settings.index_alias_prefix,
            index_version = settings.index_version,
            kafka_broker = %settings.kafka_broker,
            kafka_group_id = %settings.kafka_group_id,
            kafka_topic = %settings.kafka_topic,
            connection_mode = ?settings.connection_mode,
            retry_interval_secs = settings.retry_interval.as_secs(),
            failure_policy = ?settings.failure_policy,
            "Initializing dependencies"
        );

        let store = Arc::new(
            PostgresStore::connect_lazy(&settings.database_url)
                .map_err(|e| IndexingError::config(format!("Invalid DATABASE_URL: {}", e)))?,
        );

        let catalog = ParameterCatalog::new(store.clone());
        let schemas = Arc::new(SchemaRegistry::load(catalog).await);

        let index_config =
            IndexConfig::new(settings.index_alias_prefix.clone(), settings.index_version);
        let search_provider = Self::connect_to_opensearch(
            &settings.opensearch_url,
            index_config,
            settings.connection_mode,
            settings.retry_interval,
        )
        .await?;

        info!("OpenSearch connection established");

        let consumer = KafkaConsumer::new(
            &settings.kafka_broker,
            &settings.kafka_group_id,
            &settings.kafka_topic,
        )
        .map_err(|e| IndexingError::config(format!("Failed to create Kafka consumer: {}", e)))?;

        info!("Kafka consumer created");

        let processor = EntityProcessor::with_policy(
            AssemblerRegistry::new(store.clone()),
            settings.failure_policy,
        );

        let loader = SearchLoader::with_config(
            Arc::new(search_provider),
            LoaderConfig {
                batch_size: settings.loader_batch_size,
            },
        );

        let orchestrator = Orchestrator::with_config(
            Arc::new(consumer),
            processor,
            loader,
            schemas,
            OrchestratorConfig {
                schema_refresh_interval: settings.schema_refresh_interval,
                reindex_batch_size: settings.loader_batch_size,
                ..OrchestratorConfig::default()
            },
        );

        Ok(Self {
            orchestrator,
            store,
            settings,
        })
    }

    /// Connect to OpenSearch with retry logic based on connection mode.
    ///
    /// Invalid configuration fails in both modes.
    async fn connect_to_opensearch(
        url: &str,
        index_config: IndexConfig,
        mode: ConnectionMode,
        retry_interval: Duration,
    ) -> Result<OpenSearchProvider, IndexingError> {
        loop {
            match OpenSearchProvider::new(url, index_config.clone()).await {
                Ok(provider) => return Ok(provider),
                Err(e) => match mode {
                    ConnectionMode::Retry if e.is_transient() => {
                        warn!(
                            opensearch_url = %url,
                            error = %e,
                            retry_interval_secs = retry_interval.as_secs(),
                            "Failed to connect to OpenSearch, retrying..."
                        );
                        sleep(retry_interval).await;
                    }
                    _ => {
                        return Err(IndexingError::config(format!(
                            "Failed to connect to OpenSearch: {}",
                            e
                        )));
                    }
                },
            }
        }
    }
}

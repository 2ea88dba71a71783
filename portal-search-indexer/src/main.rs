//! Portal Search Indexer Main Entry Point
//!
//! Consumes entity change events from Kafka and indexes experiment, dataset and
//! datafile documents into OpenSearch.

use dotenv::dotenv;
use portal_search_indexer::{Dependencies, IndexingError};
use std::env;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging.
///
/// `LOG_FORMAT=json` switches to structured JSON output for log shipping.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("portal_search_indexer=info,portal_search_repository=info")
    });

    let json = env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .init();

        info!(
            service_name = "portal-search-indexer",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with JSON format"
        );
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .init();

        info!(
            service_name = "portal-search-indexer",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with console output"
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), IndexingError> {
    dotenv().ok();

    init_tracing();

    info!("Starting Portal Search Indexer");

    let mut deps = match Dependencies::new().await {
        Ok(deps) => {
            info!("Dependencies initialized successfully");
            deps
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    if deps.settings.reindex_on_startup {
        let store = deps.store.clone();
        if let Err(e) = deps.orchestrator.reindex_all(store.as_ref()).await {
            error!(error = %e, "Full re-index failed");
            return Err(e.into());
        }
    }

    match deps.orchestrator.run().await {
        Ok(()) => {
            info!("Search indexer completed successfully");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Search indexer failed");
            Err(e.into())
        }
    }
}

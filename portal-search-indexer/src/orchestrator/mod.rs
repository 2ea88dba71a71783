//! Orchestrator module for the search indexer ingest.
//!
//! Coordinates the consumer, processor, and loader components, keeps the schema
//! snapshot fresh and runs full re-indexes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, Duration, Interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

pub use crate::consumer::Consumer;
use crate::consumer::{EntityEvent, StreamMessage};
use crate::errors::IngestError;
use crate::loader::SearchLoader;
use crate::processor::EntityProcessor;
use crate::schema::SchemaRegistry;
use portal_search_repository::EntityStore;
use portal_search_shared::EntityKind;

const PROGRESS_INTERVAL: Duration = Duration::from_secs(10);

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Size of the message channel buffer.
    pub channel_buffer_size: usize,
    /// How often to reload the parameter catalog. `None` disables refreshing.
    pub schema_refresh_interval: Option<Duration>,
    /// Number of entities assembled per batch during a full re-index.
    pub reindex_batch_size: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: 1000,
            schema_refresh_interval: None,
            reindex_batch_size: 100,
        }
    }
}

/// Orchestrator that coordinates the ingest components.
///
/// The orchestrator:
/// - Manages the lifecycle of ingest components
/// - Routes messages between components
/// - Refreshes the index schemas and extends the index mappings
/// - Handles shutdown signals
pub struct Orchestrator {
    consumer: Arc<dyn Consumer>,
    processor: EntityProcessor,
    loader: SearchLoader,
    schemas: Arc<SchemaRegistry>,
    config: OrchestratorConfig,
    shutdown_tx: broadcast::Sender<()>,
    /// Total number of events processed since startup.
    total_events_processed: Arc<AtomicU64>,
    /// Total number of documents indexed since startup.
    total_documents_indexed: Arc<AtomicU64>,
}

impl Orchestrator {
    /// Create a new orchestrator with the given components.
    pub fn new(
        consumer: Arc<dyn Consumer>,
        processor: EntityProcessor,
        loader: SearchLoader,
        schemas: Arc<SchemaRegistry>,
    ) -> Self {
        Self::with_config(
            consumer,
            processor,
            loader,
            schemas,
            OrchestratorConfig::default(),
        )
    }

    /// Create a new orchestrator with custom configuration.
    pub fn with_config(
        consumer: Arc<dyn Consumer>,
        processor: EntityProcessor,
        loader: SearchLoader,
        schemas: Arc<SchemaRegistry>,
        config: OrchestratorConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            consumer,
            processor,
            loader,
            schemas,
            config,
            shutdown_tx,
            total_events_processed: Arc::new(AtomicU64::new(0)),
            total_documents_indexed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Total number of documents indexed since startup.
    pub fn documents_indexed(&self) -> u64 {
        self.total_documents_indexed.load(Ordering::Relaxed)
    }

    /// Run the orchestrator.
    ///
    /// This method starts all ingest components and coordinates message flow.
    /// It blocks until a shutdown signal is received or an error occurs.
    #[instrument(skip(self))]
    pub async fn run(&mut self) -> Result<(), IngestError> {
        info!("Starting search indexer orchestrator");

        self.loader.ensure_indexes(&self.schemas.current()).await?;

        // Subscribe to Kafka topics
        self.consumer.subscribe()?;

        let (event_transmitter, mut event_receiver) =
            mpsc::channel::<StreamMessage>(self.config.channel_buffer_size);
        let (ack_transmitter, ack_receiver) =
            mpsc::channel::<StreamMessage>(self.config.channel_buffer_size);

        // Start consumer in background
        let consumer = Arc::clone(&self.consumer);
        let shutdown_rx = self.shutdown_tx.subscribe();

        let consumer_handle = tokio::spawn(async move {
            consumer
                .run(event_transmitter, ack_receiver, shutdown_rx)
                .await
        });

        info!("Ready to process entity change events");

        let mut progress = ProgressTracker::new(
            Arc::clone(&self.total_events_processed),
            Arc::clone(&self.total_documents_indexed),
        );
        let mut progress_timer = interval(PROGRESS_INTERVAL);
        progress_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut refresh_timer = self.config.schema_refresh_interval.map(|period| {
            let mut timer = interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            timer
        });
        if let Some(timer) = refresh_timer.as_mut() {
            // The first tick completes immediately and the schema was just loaded
            timer.tick().await;
        }

        loop {
            tokio::select! {
                msg = event_receiver.recv() => {
                    match msg {
                        Some(StreamMessage::Events { events, offsets }) => {
                            info!(
                                event_count = events.len(),
                                offset_count = offsets.len(),
                                "Received events from consumer"
                            );
                            let result = self.process_events(events).await;
                            if let Err(e) = &result {
                                error!(error = %e, "Failed to process events, offsets stay uncommitted");
                            }
                            let _ = ack_transmitter.send(acknowledgment(offsets, result)).await;
                        }
                        Some(StreamMessage::Error(e)) => {
                            error!(error = %e, "Received error from consumer");
                        }
                        Some(StreamMessage::End) | None => {
                            info!("Consumer stream ended");
                            break;
                        }
                        Some(StreamMessage::Acknowledgment { .. }) => {
                            warn!("Received acknowledgment on event channel (should be on ack channel)");
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    let _ = self.shutdown_tx.send(());
                    break;
                }
                _ = next_tick(&mut refresh_timer) => {
                    self.refresh_schemas().await;
                }
                _ = progress_timer.tick() => {
                    let rates = progress.sample(Instant::now());
                    info!(
                        events_processed = rates.events,
                        documents_indexed = rates.documents,
                        documents_skipped = self.processor.skipped_count(),
                        events_per_sec = format!("{:.2}", rates.events_per_sec),
                        documents_per_sec = format!("{:.2}", rates.documents_per_sec),
                        "Processing progress"
                    );
                }
            }
        }

        // Pending documents are not flushed on shutdown: their offsets cannot be
        // acknowledged anymore, so they are re-consumed on next startup.

        let consumer_result = match consumer_handle.await {
            Ok(result) => result,
            Err(e) => Err(IngestError::ChannelError(format!("Consumer task failed: {}", e))),
        };

        info!(
            total_events_processed = self.total_events_processed.load(Ordering::Relaxed),
            total_documents_indexed = self.total_documents_indexed.load(Ordering::Relaxed),
            documents_skipped = self.processor.skipped_count(),
            "Orchestrator shutdown complete"
        );

        if let Err(e) = &consumer_result {
            error!(error = %e, "Consumer stopped with an error");
        }
        consumer_result
    }

    /// Assemble and index every entity in the store.
    ///
    /// Returns the number of documents indexed.
    #[instrument(skip(self, store))]
    pub async fn reindex_all(&mut self, store: &dyn EntityStore) -> Result<u64, IngestError> {
        let (schemas, _) = self.schemas.refresh().await;
        self.loader.ensure_indexes(&schemas).await?;

        let before = self.documents_indexed();
        let batch_size = self.config.reindex_batch_size.max(1);

        for kind in EntityKind::ALL {
            let ids = store.list_ids(kind).await?;
            info!(kind = %kind, count = ids.len(), "Re-indexing entities");

            for chunk in ids.chunks(batch_size) {
                let events = chunk
                    .iter()
                    .map(|&id| EntityEvent::upsert(kind, id))
                    .collect();
                self.process_events(events).await?;
            }
        }

        let indexed = self.documents_indexed() - before;
        info!(documents_indexed = indexed, "Full re-index complete");
        Ok(indexed)
    }

    /// Reload the schemas and extend the index mappings if they changed.
    ///
    /// Failures are logged; the previous mappings keep serving.
    pub async fn refresh_schemas(&mut self) {
        let (schemas, changed) = self.schemas.refresh().await;
        if !changed {
            debug!("Index schemas unchanged");
            return;
        }

        match self.loader.ensure_indexes(&schemas).await {
            Ok(()) => info!("Index mappings updated after schema refresh"),
            Err(e) => error!(error = %e, "Failed to update index mappings after schema refresh"),
        }
    }

    /// Process a batch of events through the ingest.
    ///
    /// Documents are flushed to the search index before this returns `Ok`, so the
    /// caller can acknowledge the batch's offsets.
    async fn process_events(&mut self, events: Vec<EntityEvent>) -> Result<(), IngestError> {
        let event_count = events.len();
        self.total_events_processed
            .fetch_add(event_count as u64, Ordering::Relaxed);

        debug!(event_count = event_count, "Processing batch of events");

        let schemas = self.schemas.current();
        let processed = self.processor.process_batch(events, &schemas).await?;

        if processed.is_empty() {
            debug!("No documents to index after processing");
            return Ok(());
        }

        let before = self.loader.indexed_count();
        let result = match self.loader.load(processed).await {
            Ok(()) => self.loader.flush().await,
            Err(e) => Err(e),
        };

        self.total_documents_indexed
            .fetch_add(self.loader.indexed_count() - before, Ordering::Relaxed);

        result
    }

    /// Trigger a graceful shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// A sender that triggers a graceful shutdown while [`Orchestrator::run`] holds `self`.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }
}

fn acknowledgment(
    offsets: Vec<(String, i32, i64)>,
    result: Result<(), IngestError>,
) -> StreamMessage {
    StreamMessage::Acknowledgment {
        offsets,
        success: result.is_ok(),
        error: result.err().map(|e| e.to_string()),
    }
}

/// Counter totals and their rates since the previous sample.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ProgressRates {
    events: u64,
    documents: u64,
    events_per_sec: f64,
    documents_per_sec: f64,
}

struct ProgressTracker {
    events: Arc<AtomicU64>,
    documents: Arc<AtomicU64>,
    last_events: u64,
    last_documents: u64,
    last_sample: Instant,
}

impl ProgressTracker {
    fn new(events: Arc<AtomicU64>, documents: Arc<AtomicU64>) -> Self {
        Self {
            last_events: events.load(Ordering::Relaxed),
            last_documents: documents.load(Ordering::Relaxed),
            events,
            documents,
            last_sample: Instant::now(),
        }
    }

    fn sample(&mut self, now: Instant) -> ProgressRates {
        let events = self.events.load(Ordering::Relaxed);
        let documents = self.documents.load(Ordering::Relaxed);
        let elapsed = now.saturating_duration_since(self.last_sample).as_secs_f64();

        let rate = |current: u64, previous: u64| {
            if elapsed > 0.0 {
                current.saturating_sub(previous) as f64 / elapsed
            } else {
                0.0
            }
        };
        let rates = ProgressRates {
            events,
            documents,
            events_per_sec: rate(events, self.last_events),
            documents_per_sec: rate(documents, self.last_documents),
        };

        self.last_events = events;
        self.last_documents = documents;
        self.last_sample = now;
        rates
    }
}

/// Wait for the next tick of an optional timer; never completes without one.
async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

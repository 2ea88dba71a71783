//! Consumer module for the search indexer ingest.
//!
//! Provides the [`Consumer`] abstraction and its Kafka implementation for
//! receiving entity change events.

mod kafka_consumer;
mod messages;

pub use kafka_consumer::{KafkaConsumer, ENTITY_CHANGES_TOPIC};
pub use messages::{EntityEvent, EntityEventType, StreamMessage};

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

use crate::errors::IngestError;

/// Source of entity change events.
///
/// Implementations send [`StreamMessage::Events`] batches on `sender` and must
/// only treat a batch as consumed once a positive [`StreamMessage::Acknowledgment`]
/// for its offsets arrives on `ack_receiver`.
#[async_trait]
pub trait Consumer: Send + Sync {
    /// Subscribe to the event source.
    fn subscribe(&self) -> Result<(), IngestError>;

    /// Consume events until the stream ends or `shutdown` fires.
    async fn run(
        &self,
        sender: mpsc::Sender<StreamMessage>,
        ack_receiver: mpsc::Receiver<StreamMessage>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), IngestError>;
}

//! Kafka consumer for portal entity change notifications.
//!
//! Notifications are decoded into [`EntityEvent`]s and forwarded in batches. Every
//! message read, including empty and undecodable ones, belongs to the batch it was
//! read into, and a batch's offsets are committed only once the orchestrator
//! acknowledges it. Kafka commits are cumulative per partition, so a rejected batch
//! stops consumption: nothing after it may be committed, and it is re-read after a
//! restart.

use async_trait::async_trait;
use futures::StreamExt;
use rdkafka::{
    config::ClientConfig,
    consumer::{CommitMode, Consumer as _, StreamConsumer},
    message::{BorrowedMessage, Message as KafkaMessage},
    Offset, TopicPartitionList,
};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

use crate::consumer::messages::{EntityEvent, StreamMessage};
use crate::consumer::Consumer;
use crate::errors::IngestError;

/// The topic the portal publishes entity changes to.
pub const ENTITY_CHANGES_TOPIC: &str = "portal.entity-changes";

const DEFAULT_BATCH_SIZE: usize = 50;

const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_millis(1000);

type MessageOffset = (String, i32, i64);

/// Messages read since the last hand-off: their offsets, and the events decoded
/// from those that carried one.
#[derive(Debug, Default)]
struct PendingBatch {
    events: Vec<EntityEvent>,
    offsets: Vec<MessageOffset>,
}

impl PendingBatch {
    fn push(&mut self, event: EntityEvent, offset: MessageOffset) {
        self.events.push(event);
        self.offsets.push(offset);
    }

    /// Track a message that yields no event, so it is committed with the batch.
    fn push_offset(&mut self, offset: MessageOffset) {
        self.offsets.push(offset);
    }

    /// Number of messages in the batch.
    fn len(&self) -> usize {
        self.offsets.len()
    }

    fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Empty the batch into an [`StreamMessage::Events`], or `None` when no
    /// message was read. A batch of messages without events is still handed off
    /// so its offsets get acknowledged.
    fn take(&mut self) -> Option<StreamMessage> {
        if self.is_empty() {
            return None;
        }
        Some(StreamMessage::Events {
            events: std::mem::take(&mut self.events),
            offsets: std::mem::take(&mut self.offsets),
        })
    }
}

/// The offset to commit for each partition: one past the highest acknowledged.
fn commit_positions(offsets: &[MessageOffset]) -> Vec<MessageOffset> {
    let mut highest: BTreeMap<(&str, i32), i64> = BTreeMap::new();
    for (topic, partition, offset) in offsets {
        let entry = highest.entry((topic.as_str(), *partition)).or_insert(*offset);
        *entry = (*entry).max(*offset);
    }

    highest
        .into_iter()
        .map(|((topic, partition), offset)| (topic.to_string(), partition, offset + 1))
        .collect()
}

fn offset_of(msg: &BorrowedMessage<'_>) -> MessageOffset {
    (msg.topic().to_string(), msg.partition(), msg.offset())
}

/// Kafka consumer for entity change events.
pub struct KafkaConsumer {
    consumer: StreamConsumer,
    topic: String,
    batch_size: usize,
    batch_timeout: Duration,
}

impl KafkaConsumer {
    /// Create a consumer for `topic` with the default batching of 50 events or one
    /// second, whichever comes first.
    ///
    /// # Arguments
    ///
    /// * `brokers` - Kafka broker addresses (comma-separated)
    /// * `group_id` - Consumer group ID
    /// * `topic` - Topic carrying the change notifications
    pub fn new(brokers: &str, group_id: &str, topic: &str) -> Result<Self, IngestError> {
        Self::with_batching(
            brokers,
            group_id,
            topic,
            DEFAULT_BATCH_SIZE,
            DEFAULT_BATCH_TIMEOUT,
        )
    }

    /// Create a consumer with custom batching.
    ///
    /// A partial batch is handed off once `batch_timeout` passes without it
    /// filling up.
    pub fn with_batching(
        brokers: &str,
        group_id: &str,
        topic: &str,
        batch_size: usize,
        batch_timeout: Duration,
    ) -> Result<Self, IngestError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "6000")
            .create()?;

        info!(
            brokers = %brokers,
            group_id = %group_id,
            topic = %topic,
            batch_size = batch_size,
            batch_timeout_ms = batch_timeout.as_millis() as u64,
            "Created Kafka consumer"
        );

        Ok(Self {
            consumer,
            topic: topic.to_string(),
            batch_size: batch_size.max(1),
            batch_timeout,
        })
    }

    async fn hand_off(
        &self,
        batch: &mut PendingBatch,
        sender: &mpsc::Sender<StreamMessage>,
    ) -> Result<(), IngestError> {
        let Some(message) = batch.take() else {
            return Ok(());
        };

        if let StreamMessage::Events { events, .. } = &message {
            debug!(event_count = events.len(), "Handing batch to the orchestrator");
        }
        sender
            .send(message)
            .await
            .map_err(|e| IngestError::ChannelError(e.to_string()))
    }

    fn commit(&self, offsets: &[MessageOffset]) -> Result<(), IngestError> {
        if offsets.is_empty() {
            return Ok(());
        }

        let mut tpl = TopicPartitionList::new();
        for (topic, partition, position) in commit_positions(offsets) {
            tpl.add_partition_offset(&topic, partition, Offset::Offset(position))?;
        }
        self.consumer.commit(&tpl, CommitMode::Async)?;
        Ok(())
    }

    /// Commit an acknowledged batch, or stop on a rejected one.
    fn on_acknowledgment(
        &self,
        offsets: &[MessageOffset],
        success: bool,
        error: Option<&str>,
    ) -> Result<(), IngestError> {
        if !success {
            let error = error.unwrap_or("Unknown error");
            error!(
                offset_count = offsets.len(),
                error = %error,
                "Batch rejected, stopping before any later commit"
            );
            return Err(IngestError::batch_rejected(error));
        }

        match self.commit(offsets) {
            Ok(()) => debug!(offset_count = offsets.len(), "Committed acknowledged offsets"),
            Err(e) => error!(error = %e, "Failed to commit acknowledged offsets"),
        }
        Ok(())
    }

    /// Decode a message into an event. `Ok(None)` for messages without a payload.
    fn decode(msg: &BorrowedMessage<'_>) -> Result<Option<EntityEvent>, IngestError> {
        match msg.payload() {
            Some(payload) if !payload.is_empty() => EntityEvent::from_json(payload).map(Some),
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl Consumer for KafkaConsumer {
    fn subscribe(&self) -> Result<(), IngestError> {
        self.consumer.subscribe(&[self.topic.as_str()])?;
        info!(topic = %self.topic, "Subscribed to entity changes");
        Ok(())
    }

    #[instrument(skip(self, sender, ack_receiver, shutdown), fields(topic = %self.topic))]
    async fn run(
        &self,
        sender: mpsc::Sender<StreamMessage>,
        mut ack_receiver: mpsc::Receiver<StreamMessage>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), IngestError> {
        let mut messages = self.consumer.stream();
        let mut batch = PendingBatch::default();
        let mut batch_timer = tokio::time::interval(self.batch_timeout);
        batch_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        batch_timer.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!(pending = batch.len(), "Consumer shutting down");
                    let _ = sender.send(StreamMessage::End).await;
                    break;
                }
                ack = ack_receiver.recv() => match ack {
                    Some(StreamMessage::Acknowledgment { offsets, success, error }) => {
                        self.on_acknowledgment(&offsets, success, error.as_deref())?;
                    }
                    Some(StreamMessage::End) | None => {
                        info!("Acknowledgment channel closed");
                        break;
                    }
                    Some(_) => warn!("Unexpected message on acknowledgment channel"),
                },
                message = messages.next() => match message {
                    Some(Ok(msg)) => match Self::decode(&msg) {
                        Ok(Some(event)) => {
                            batch.push(event, offset_of(&msg));
                            if batch.len() >= self.batch_size {
                                self.hand_off(&mut batch, &sender).await?;
                            }
                        }
                        Ok(None) => {
                            debug!(offset = msg.offset(), "Message without payload");
                            batch.push_offset(offset_of(&msg));
                        }
                        Err(e) => {
                            // Skipped, and committed with the rest of its batch.
                            error!(
                                partition = msg.partition(),
                                offset = msg.offset(),
                                error = %e,
                                "Skipping undecodable change notification"
                            );
                            batch.push_offset(offset_of(&msg));
                        }
                    },
                    Some(Err(e)) => {
                        error!(error = %e, "Kafka error");
                        let _ = sender.send(StreamMessage::Error(e.to_string())).await;
                    }
                    None => {
                        info!("Kafka stream ended");
                        self.hand_off(&mut batch, &sender).await?;
                        let _ = sender.send(StreamMessage::End).await;
                        break;
                    }
                },
                _ = batch_timer.tick(), if !batch.is_empty() => {
                    self.hand_off(&mut batch, &sender).await?;
                }
            }
        }

        Ok(())
    }
}

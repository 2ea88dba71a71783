//! Entity processor implementation.
//!
//! Transforms entity events into documents by running the assembler of the
//! event's entity kind against the current schema snapshot.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use portal_search_shared::{Document, EntityKind};
use tracing::{debug, error, instrument, warn};

use crate::assembler::AssemblerRegistry;
use crate::consumer::{EntityEvent, EntityEventType};
use crate::errors::{AssemblyError, IngestError};
use crate::schema::SchemaSet;

/// Processed result from the entity processor.
#[derive(Debug)]
pub enum ProcessedEvent {
    /// Document to be indexed (create or replace).
    Index(Document),
    /// Document to be deleted.
    Delete { kind: EntityKind, id: i64 },
}

/// What to do when a document cannot be assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the failure and continue with the rest of the batch.
    #[default]
    Skip,
    /// Fail the whole batch so it is not acknowledged.
    Abort,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "abort" => Ok(Self::Abort),
            other => Err(format!("unknown failure policy '{}'", other)),
        }
    }
}

/// Processor that transforms entity events into search documents.
pub struct EntityProcessor {
    assemblers: AssemblerRegistry,
    policy: FailurePolicy,
    /// Documents skipped because they could not be assembled.
    skipped: AtomicU64,
}

impl EntityProcessor {
    /// Create a new entity processor that skips documents it cannot assemble.
    pub fn new(assemblers: AssemblerRegistry) -> Self {
        Self::with_policy(assemblers, FailurePolicy::default())
    }

    pub fn with_policy(assemblers: AssemblerRegistry, policy: FailurePolicy) -> Self {
        Self {
            assemblers,
            policy,
            skipped: AtomicU64::new(0),
        }
    }

    /// Number of documents skipped since startup.
    pub fn skipped_count(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Process a batch of entity events.
    ///
    /// Several events for the same entity are collapsed into the last one, since
    /// assembly always reads the entity's current state.
    #[instrument(skip(self, events, schemas), fields(event_count = events.len()))]
    pub async fn process_batch(
        &self,
        events: Vec<EntityEvent>,
        schemas: &SchemaSet,
    ) -> Result<Vec<ProcessedEvent>, IngestError> {
        let events = coalesce(events);
        let mut processed = Vec::with_capacity(events.len());

        for event in events {
            if let Some(result) = self.process_event(event, schemas).await? {
                processed.push(result);
            }
        }

        debug!(processed_count = processed.len(), "Processed event batch");
        Ok(processed)
    }

    /// Process a single entity event.
    async fn process_event(
        &self,
        event: EntityEvent,
        schemas: &SchemaSet,
    ) -> Result<Option<ProcessedEvent>, IngestError> {
        match event.event_type {
            EntityEventType::Upsert => {
                match self.assemblers.assemble(event.kind, event.id, schemas).await {
                    Ok(document) => Ok(Some(ProcessedEvent::Index(document))),
                    Err(e) if is_entity_gone(&e) => {
                        // Deleted after the event was published; its delete event follows.
                        warn!(kind = %event.kind, id = event.id, "Entity no longer exists, skipping");
                        Ok(None)
                    }
                    Err(e) => self.handle_failure(e),
                }
            }
            EntityEventType::Delete => Ok(Some(ProcessedEvent::Delete {
                kind: event.kind,
                id: event.id,
            })),
        }
    }

    fn handle_failure(&self, err: AssemblyError) -> Result<Option<ProcessedEvent>, IngestError> {
        match self.policy {
            FailurePolicy::Skip => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
                error!(
                    kind = %err.kind(),
                    id = err.id(),
                    error = %err,
                    "Failed to assemble document, skipping"
                );
                Ok(None)
            }
            FailurePolicy::Abort => Err(err.into()),
        }
    }
}

/// The entity itself, not one of its ancestors, is missing.
fn is_entity_gone(err: &AssemblyError) -> bool {
    matches!(
        err,
        AssemblyError::NotFound { kind, id, missing_kind, missing_id }
            if kind == missing_kind && id == missing_id
    )
}

/// Keep only the last event of each entity, in the order of those last events.
fn coalesce(events: Vec<EntityEvent>) -> Vec<EntityEvent> {
    let mut last: HashMap<(EntityKind, i64), usize> = HashMap::with_capacity(events.len());
    for (index, event) in events.iter().enumerate() {
        last.insert((event.kind, event.id), index);
    }

    events
        .into_iter()
        .enumerate()
        .filter(|(index, event)| last.get(&(event.kind, event.id)) == Some(index))
        .map(|(_, event)| event)
        .collect()
}

//! Message types for the consumer.
//!
//! Defines the event structures that flow through the ingest, and the JSON change
//! notification they are decoded from.

use portal_search_shared::EntityKind;
use serde::Deserialize;

use crate::errors::IngestError;

/// Types of entity events that can be received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityEventType {
    /// Entity was created or updated.
    Upsert,
    /// Entity was deleted.
    Delete,
}

/// A change to one portal entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityEvent {
    /// The type of event.
    pub event_type: EntityEventType,
    pub kind: EntityKind,
    pub id: i64,
}

impl EntityEvent {
    /// Create a new upsert event.
    pub fn upsert(kind: EntityKind, id: i64) -> Self {
        Self {
            event_type: EntityEventType::Upsert,
            kind,
            id,
        }
    }

    /// Create a new delete event.
    pub fn delete(kind: EntityKind, id: i64) -> Self {
        Self {
            event_type: EntityEventType::Delete,
            kind,
            id,
        }
    }

    /// Decode a change notification payload.
    ///
    /// The payload is a JSON object such as
    /// `{"kind": "datafile", "id": 12, "action": "save"}`. `action` is `save` or
    /// `delete`.
    pub fn from_json(payload: &[u8]) -> Result<Self, IngestError> {
        let notification: ChangeNotification = serde_json::from_slice(payload)
            .map_err(|e| IngestError::parse(format!("Invalid change notification: {}", e)))?;

        let kind = notification
            .kind
            .parse::<EntityKind>()
            .map_err(IngestError::parse)?;

        let event = match notification.action {
            ChangeAction::Save => Self::upsert(kind, notification.id),
            ChangeAction::Delete => Self::delete(kind, notification.id),
        };
        Ok(event)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ChangeAction {
    Save,
    Delete,
}

#[derive(Debug, Deserialize)]
struct ChangeNotification {
    kind: String,
    id: i64,
    action: ChangeAction,
}

/// Messages that flow through the ingest.
#[derive(Debug)]
pub enum StreamMessage {
    /// A batch of entity events with associated offsets for acknowledgment.
    Events {
        events: Vec<EntityEvent>,
        offsets: Vec<(String, i32, i64)>,
    },
    /// Acknowledgment that events were successfully processed.
    Acknowledgment {
        offsets: Vec<(String, i32, i64)>,
        success: bool,
        error: Option<String>,
    },
    /// Stream has ended.
    End,
    /// An error occurred.
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_save() {
        let event = EntityEvent::from_json(br#"{"kind":"datafile","id":12,"action":"save"}"#)
            .unwrap();
        assert_eq!(event, EntityEvent::upsert(EntityKind::Datafile, 12));
    }

    #[test]
    fn test_from_json_delete_accepts_dataset_file() {
        let event =
            EntityEvent::from_json(br#"{"kind":"dataset_file","id":3,"action":"delete"}"#)
                .unwrap();
        assert_eq!(event, EntityEvent::delete(EntityKind::Datafile, 3));
    }

    #[test]
    fn test_from_json_rejects_bad_payloads() {
        let payloads: [&[u8]; 4] = [
            b"not json",
            br#"{"kind":"sample","id":1,"action":"save"}"#,
            br#"{"kind":"dataset","id":1,"action":"archive"}"#,
            br#"{"kind":"dataset","action":"save"}"#,
        ];
        for payload in payloads {
            assert!(matches!(
                EntityEvent::from_json(payload),
                Err(IngestError::ParseError(_))
            ));
        }
    }
}

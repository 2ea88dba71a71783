//! # Portal Search Shared
//!
//! This crate defines the data structures shared across the portal search indexer:
//! entity kinds and records, parameter definitions and values, the field schemas
//! discovered from the parameter catalog, and the documents handed to the search index.

pub mod types;

pub use types::document::{document_id, Document, FieldValue};
pub use types::entity_kind::EntityKind;
pub use types::parameter::{ParameterDataType, ParameterDefinition, ParameterValue, ValueKind};
pub use types::records::{DatafileRecord, DatasetRecord, ExperimentRecord};
pub use types::schema::{FieldKind, FieldSchema, FieldSpec, IndexSchema, TEXT_FIELD};

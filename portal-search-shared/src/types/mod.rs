//! Core data structures used across the search indexer.

pub mod document;
pub mod entity_kind;
pub mod parameter;
pub mod records;
pub mod schema;

pub use document::{Document, FieldValue};
pub use entity_kind::EntityKind;
pub use parameter::{ParameterDataType, ParameterDefinition, ParameterValue, ValueKind};
pub use records::{DatafileRecord, DatasetRecord, ExperimentRecord};
pub use schema::{FieldKind, FieldSchema, FieldSpec, IndexSchema};

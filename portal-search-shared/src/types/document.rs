//! Document types for the search index.
//!
//! This module defines the flat document structure that is handed to the search engine.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::entity_kind::EntityKind;
use crate::types::schema::TEXT_FIELD;

/// Value of a single document field.
///
/// Serialized untagged, so a document becomes a plain JSON object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Number(f64),
    DateTime(DateTime<Utc>),
    MultiText(Vec<String>),
    Null,
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::DateTime(value)
    }
}

impl From<Option<DateTime<Utc>>> for FieldValue {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        value.map(FieldValue::DateTime).unwrap_or(FieldValue::Null)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::MultiText(value)
    }
}

/// Document representation for the search index.
///
/// One document is assembled per entity instance. The `text` field is always
/// present; every other field is optional and depends on the entity's kind and
/// on the parameters attached to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub kind: EntityKind,
    pub id: i64,
    pub fields: BTreeMap<String, FieldValue>,
}

impl Document {
    /// Create a document holding only its free-text field.
    pub fn new(kind: EntityKind, id: i64, text: impl Into<String>) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(TEXT_FIELD.to_string(), FieldValue::Text(text.into()));
        Self { kind, id, fields }
    }

    /// Set a field, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// The free-text field.
    pub fn text(&self) -> &str {
        self.fields
            .get(TEXT_FIELD)
            .and_then(FieldValue::as_text)
            .unwrap_or_default()
    }

    /// Generate the document ID used in the search index.
    ///
    /// Ids are only unique within a kind, so the kind prefix is part of the ID.
    pub fn document_id(&self) -> String {
        document_id(self.kind, self.id)
    }
}

/// Document ID for an entity, e.g. `experiment.42`.
pub fn document_id(kind: EntityKind, id: i64) -> String {
    format!("{}.{}", kind.prefix(), id)
}

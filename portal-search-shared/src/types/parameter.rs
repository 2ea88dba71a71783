//! Parameter definitions from the metadata catalog and the values attached to entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::entity_kind::EntityKind;

/// Declared data type of a parameter name, as stored in the catalog.
///
/// The numeric codes match the catalog's `data_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterDataType {
    Numeric,
    String,
    Url,
    Link,
    Filename,
    DateTime,
    LongString,
    Json,
}

impl ParameterDataType {
    /// Map a catalog `data_type` code. Unknown codes are treated as plain strings.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Numeric,
            2 => Self::String,
            3 => Self::Url,
            4 => Self::Link,
            5 => Self::Filename,
            6 => Self::DateTime,
            7 => Self::LongString,
            8 => Self::Json,
            _ => Self::String,
        }
    }
}

/// Kind of value a parameter field holds in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Numeric,
    DateTime,
    Text,
}

/// A parameter name from the metadata catalog, scoped to the entity kind that uses it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub name: String,
    pub entity_kind: EntityKind,
    pub data_type: ParameterDataType,
    pub is_searchable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

impl ParameterDefinition {
    pub fn new(
        name: impl Into<String>,
        entity_kind: EntityKind,
        data_type: ParameterDataType,
        is_searchable: bool,
    ) -> Self {
        Self {
            name: name.into(),
            entity_kind,
            data_type,
            is_searchable,
            full_name: None,
            units: None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.data_type == ParameterDataType::Numeric
    }

    pub fn is_datetime(&self) -> bool {
        self.data_type == ParameterDataType::DateTime
    }

    /// Name of the document field this parameter populates.
    pub fn field_name(&self) -> String {
        self.entity_kind.field_name(&self.name)
    }
}

/// One parameter value attached to an entity through a parameter set.
///
/// Only the slot selected by the definition's value kind is meaningful.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterValue {
    pub definition: ParameterDefinition,
    pub numeric_value: Option<f64>,
    pub datetime_value: Option<DateTime<Utc>>,
    pub string_value: Option<String>,
}

impl ParameterValue {
    pub fn numeric(definition: ParameterDefinition, value: f64) -> Self {
        Self {
            definition,
            numeric_value: Some(value),
            datetime_value: None,
            string_value: None,
        }
    }

    pub fn datetime(definition: ParameterDefinition, value: DateTime<Utc>) -> Self {
        Self {
            definition,
            numeric_value: None,
            datetime_value: Some(value),
            string_value: None,
        }
    }

    pub fn string(definition: ParameterDefinition, value: impl Into<String>) -> Self {
        Self {
            definition,
            numeric_value: None,
            datetime_value: None,
            string_value: Some(value.into()),
        }
    }
}

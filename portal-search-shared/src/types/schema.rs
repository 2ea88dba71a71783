//! Field schemas for the search index.
//!
//! An [`IndexSchema`] combines the fixed fields every document of a kind carries with
//! the dynamic [`FieldSchema`] discovered from the parameter catalog.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::entity_kind::EntityKind;
use crate::types::parameter::ValueKind;

/// Name of the free-text field that defines every document.
pub const TEXT_FIELD: &str = "text";

/// Type of a field in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Integer,
    Numeric,
    DateTime,
    MultiText,
}

impl From<ValueKind> for FieldKind {
    fn from(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Numeric => FieldKind::Numeric,
            ValueKind::DateTime => FieldKind::DateTime,
            ValueKind::Text => FieldKind::Text,
        }
    }
}

/// Declaration of a single index field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    /// `false` for fields that are stored for display but not searchable.
    pub indexed: bool,
    /// `true` only for the designated free-text field.
    pub document: bool,
}

impl FieldSpec {
    fn indexed(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            indexed: true,
            document: false,
        }
    }

    fn stored(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            indexed: false,
            document: false,
        }
    }

    fn text() -> Self {
        Self {
            name: TEXT_FIELD.to_string(),
            kind: FieldKind::Text,
            indexed: true,
            document: true,
        }
    }
}

/// Dynamic parameter fields of one entity kind, keyed by field name.
///
/// Ordered so that two schemas built from the same catalog snapshot compare and
/// serialize identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    fields: BTreeMap<String, ValueKind>,
}

impl FieldSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, returning the kind previously declared under that name.
    pub fn insert(&mut self, field_name: String, kind: ValueKind) -> Option<ValueKind> {
        self.fields.insert(field_name, kind)
    }

    pub fn get(&self, field_name: &str) -> Option<ValueKind> {
        self.fields.get(field_name).copied()
    }

    pub fn contains(&self, field_name: &str) -> bool {
        self.fields.contains_key(field_name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ValueKind)> {
        self.fields.iter().map(|(name, kind)| (name.as_str(), *kind))
    }
}

/// Complete schema of one entity kind's index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSchema {
    pub kind: EntityKind,
    pub fixed: Vec<FieldSpec>,
    pub parameters: FieldSchema,
}

impl IndexSchema {
    pub fn new(kind: EntityKind, parameters: FieldSchema) -> Self {
        Self {
            kind,
            fixed: fixed_fields(kind),
            parameters,
        }
    }

    /// Schema with no dynamic parameter fields.
    pub fn without_parameters(kind: EntityKind) -> Self {
        Self::new(kind, FieldSchema::new())
    }

    /// Every field of the index: fixed fields first, then parameter fields.
    pub fn fields(&self) -> Vec<FieldSpec> {
        let mut fields = self.fixed.clone();
        fields.extend(self.parameters.iter().map(|(name, kind)| FieldSpec {
            name: name.to_string(),
            kind: kind.into(),
            indexed: true,
            document: false,
        }));
        fields
    }

    pub fn field(&self, name: &str) -> Option<FieldSpec> {
        self.fields().into_iter().find(|f| f.name == name)
    }

    /// Names of fields that are stored but not searchable.
    pub fn stored_only(&self) -> Vec<&str> {
        self.fixed
            .iter()
            .filter(|f| !f.indexed)
            .map(|f| f.name.as_str())
            .collect()
    }
}

/// Stored copies of the owning experiment's descriptive fields.
fn experiment_stored_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::stored("experiment_id_stored", FieldKind::Integer),
        FieldSpec::stored("experiment_title_stored", FieldKind::Text),
        FieldSpec::stored("experiment_description_stored", FieldKind::Text),
        FieldSpec::stored("experiment_created_time_stored", FieldKind::DateTime),
        FieldSpec::stored("experiment_start_time_stored", FieldKind::DateTime),
        FieldSpec::stored("experiment_end_time_stored", FieldKind::DateTime),
        FieldSpec::stored("experiment_institution_name_stored", FieldKind::Text),
        FieldSpec::stored("experiment_update_time_stored", FieldKind::DateTime),
    ]
}

/// Fixed fields declared for every document of `kind`.
pub fn fixed_fields(kind: EntityKind) -> Vec<FieldSpec> {
    let mut fields = vec![FieldSpec::text()];
    match kind {
        EntityKind::Experiment => {
            fields.extend([
                FieldSpec::stored("experiment_id_stored", FieldKind::Integer),
                FieldSpec::indexed("experiment_description", FieldKind::Text),
                FieldSpec::indexed("experiment_title", FieldKind::Text),
                FieldSpec::indexed("experiment_created_time", FieldKind::DateTime),
                FieldSpec::indexed("experiment_start_time", FieldKind::DateTime),
                FieldSpec::indexed("experiment_end_time", FieldKind::DateTime),
                FieldSpec::indexed("experiment_update_time", FieldKind::DateTime),
                FieldSpec::indexed("experiment_institution_name", FieldKind::Text),
                FieldSpec::indexed("experiment_creator", FieldKind::Text),
                FieldSpec::indexed("experiment_authors", FieldKind::MultiText),
            ]);
        }
        EntityKind::Dataset => {
            fields.push(FieldSpec::indexed("dataset_description", FieldKind::Text));
            fields.extend(experiment_stored_fields());
        }
        EntityKind::Datafile => {
            fields.push(FieldSpec::indexed("datafile_filename", FieldKind::Text));
            fields.push(FieldSpec::stored("dataset_id_stored", FieldKind::Integer));
            fields.push(FieldSpec::stored("dataset_description_stored", FieldKind::Text));
            fields.extend(experiment_stored_fields());
        }
    }
    fields
}

//! OpenSearch index configuration and mappings.
//!
//! Each entity kind has its own index. Mappings are generated from the kind's
//! [`IndexSchema`], so dynamic parameter fields get a mapping of the type the
//! catalog declared for them.

use portal_search_shared::{EntityKind, FieldKind, FieldSpec, IndexSchema};
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::utils::validate_field_name;

/// Configuration for the search indexes.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Prefix of every alias (e.g. "tardis" gives "tardis_experiment").
    pub alias_prefix: String,
    /// The version number for the indexes (e.g., 0 for "tardis_experiment_v0").
    pub version: u32,
}

impl IndexConfig {
    /// Create a new index configuration.
    ///
    /// # Arguments
    ///
    /// * `alias_prefix` - The prefix shared by all index aliases
    /// * `version` - The version number
    pub fn new(alias_prefix: impl Into<String>, version: u32) -> Self {
        Self {
            alias_prefix: alias_prefix.into(),
            version,
        }
    }

    /// The alias used for all operations on `kind`'s index.
    pub fn alias(&self, kind: EntityKind) -> String {
        format!("{}_{}", self.alias_prefix, kind.prefix())
    }

    /// The concrete, versioned index name behind the alias.
    pub fn versioned_index_name(&self, kind: EntityKind) -> String {
        format!("{}_v{}", self.alias(kind), self.version)
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self::new("tardis", 0)
    }
}

/// Mapping of a single field.
///
/// Stored-only fields keep their value in `_source` but are not searchable.
pub fn field_mapping(field: &FieldSpec) -> Value {
    let mut mapping = match field.kind {
        FieldKind::Text | FieldKind::MultiText => json!({ "type": "text" }),
        FieldKind::Integer => json!({ "type": "long" }),
        FieldKind::Numeric => json!({ "type": "double" }),
        FieldKind::DateTime => json!({ "type": "date" }),
    };

    if !field.indexed {
        mapping["index"] = json!(false);
    }

    mapping
}

/// The `properties` object for every field in the schema.
///
/// Fields whose names cannot be used in a mapping are left out and logged.
pub fn get_mapping_properties(schema: &IndexSchema) -> Value {
    let mut properties = Map::new();

    for field in schema.fields() {
        if let Err(e) = validate_field_name(&field.name) {
            warn!(
                kind = %schema.kind,
                field = %field.name,
                error = %e,
                "Skipping field mapping"
            );
            continue;
        }
        properties.insert(field.name.clone(), field_mapping(&field));
    }

    Value::Object(properties)
}

/// The `mappings` body of a kind's index.
///
/// Dynamic mapping is off: a parameter emitted before the schema refresh that
/// declares it stays unmapped in `_source` instead of being given a guessed type
/// that the declared one could not replace.
pub fn get_mappings(schema: &IndexSchema) -> Value {
    json!({
        "dynamic": false,
        "properties": get_mapping_properties(schema)
    })
}

/// Get the index settings, mappings and alias for a new index.
///
/// # Sharding Configuration
///
/// - 1 primary shard
/// - 1 replica for redundancy
pub fn get_index_settings(config: &IndexConfig, schema: &IndexSchema) -> Value {
    let mut aliases = Map::new();
    aliases.insert(config.alias(schema.kind), json!({}));

    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 1
        },
        "aliases": aliases,
        "mappings": get_mappings(schema)
    })
}

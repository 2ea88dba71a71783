//! Index schema construction.
//!
//! The dynamic part of every entity kind's schema is derived from the parameter
//! catalog. [`SchemaRegistry`] holds the current snapshot of all three schemas and
//! hands it out as a shared, immutable [`SchemaSet`].

use std::sync::{Arc, RwLock};

use portal_search_shared::{EntityKind, FieldSchema, IndexSchema, ParameterDefinition};
use tracing::{debug, info, warn};

use crate::catalog::ParameterCatalog;
use crate::extract::classify;

/// Builds field schemas from parameter definitions.
pub struct SchemaBuilder;

impl SchemaBuilder {
    /// Build the parameter fields of `kind`, one per searchable definition.
    ///
    /// Pure and deterministic: the same definitions always give the same schema.
    /// Definitions of other kinds and unsearchable definitions are ignored. Two
    /// definitions with the same name are an upstream integrity problem; the last
    /// one wins.
    pub fn build(kind: EntityKind, definitions: &[ParameterDefinition]) -> FieldSchema {
        let mut schema = FieldSchema::new();

        for definition in definitions {
            if definition.entity_kind != kind || !definition.is_searchable {
                debug!(
                    kind = %kind,
                    parameter = %definition.name,
                    "Skipping definition not searchable for this kind"
                );
                continue;
            }

            let field_name = kind.field_name(&definition.name);
            let value_kind = classify(definition);
            if let Some(previous) = schema.insert(field_name.clone(), value_kind) {
                warn!(
                    kind = %kind,
                    field = %field_name,
                    previous = ?previous,
                    current = ?value_kind,
                    "Duplicate parameter name in catalog, keeping the last definition"
                );
            }
        }

        schema
    }

    /// Build the complete index schema of `kind`: fixed fields plus parameter fields.
    pub fn index_schema(kind: EntityKind, definitions: &[ParameterDefinition]) -> IndexSchema {
        IndexSchema::new(kind, Self::build(kind, definitions))
    }
}

/// Index schemas of all entity kinds, built from one catalog snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaSet {
    experiment: Arc<IndexSchema>,
    dataset: Arc<IndexSchema>,
    datafile: Arc<IndexSchema>,
}

impl SchemaSet {
    /// Schemas with fixed fields only.
    pub fn minimal() -> Self {
        Self {
            experiment: Arc::new(IndexSchema::without_parameters(EntityKind::Experiment)),
            dataset: Arc::new(IndexSchema::without_parameters(EntityKind::Dataset)),
            datafile: Arc::new(IndexSchema::without_parameters(EntityKind::Datafile)),
        }
    }

    /// Load the catalog of every kind and build its schema.
    pub async fn load(catalog: &ParameterCatalog) -> Self {
        let mut set = Self::minimal();
        for kind in EntityKind::ALL {
            let load = catalog.load(kind).await;
            set.replace(Arc::new(SchemaBuilder::index_schema(kind, load.definitions())));
        }
        set
    }

    pub fn get(&self, kind: EntityKind) -> Arc<IndexSchema> {
        match kind {
            EntityKind::Experiment => Arc::clone(&self.experiment),
            EntityKind::Dataset => Arc::clone(&self.dataset),
            EntityKind::Datafile => Arc::clone(&self.datafile),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexSchema> {
        [&self.experiment, &self.dataset, &self.datafile]
            .into_iter()
            .map(|schema| schema.as_ref())
    }

    fn replace(&mut self, schema: Arc<IndexSchema>) {
        match schema.kind {
            EntityKind::Experiment => self.experiment = schema,
            EntityKind::Dataset => self.dataset = schema,
            EntityKind::Datafile => self.datafile = schema,
        }
    }
}

/// Holds the current schema snapshot and rebuilds it on demand.
///
/// Readers take a cheap `Arc` of the snapshot; a refresh swaps in a new snapshot
/// without affecting assemblies that are still using the old one.
pub struct SchemaRegistry {
    catalog: ParameterCatalog,
    current: RwLock<Arc<SchemaSet>>,
}

impl SchemaRegistry {
    /// Create a registry and load the initial snapshot.
    pub async fn load(catalog: ParameterCatalog) -> Self {
        let set = SchemaSet::load(&catalog).await;
        log_schema_set(&set);
        Self {
            catalog,
            current: RwLock::new(Arc::new(set)),
        }
    }

    /// The current snapshot.
    pub fn current(&self) -> Arc<SchemaSet> {
        Arc::clone(&self.current.read().unwrap_or_else(|e| e.into_inner()))
    }

    /// Reload the catalog and replace the snapshot.
    ///
    /// Returns the new snapshot and whether it differs from the previous one.
    pub async fn refresh(&self) -> (Arc<SchemaSet>, bool) {
        let set = Arc::new(SchemaSet::load(&self.catalog).await);
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        let changed = **current != *set;
        if changed {
            log_schema_set(&set);
        }
        *current = Arc::clone(&set);
        (set, changed)
    }
}

fn log_schema_set(set: &SchemaSet) {
    for schema in set.iter() {
        info!(
            kind = %schema.kind,
            parameter_fields = schema.parameters.len(),
            "Index schema built"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_search_repository::InMemoryStore;
    use portal_search_shared::{ParameterDataType, ParameterValue, ValueKind};

    fn definition(name: &str, kind: EntityKind, data_type: ParameterDataType) -> ParameterDefinition {
        ParameterDefinition::new(name, kind, data_type, true)
    }

    #[test]
    fn test_build_names_and_types_fields() {
        let definitions = vec![
            definition("energy", EntityKind::Datafile, ParameterDataType::Numeric),
            definition("collected", EntityKind::Datafile, ParameterDataType::DateTime),
            definition("detector", EntityKind::Datafile, ParameterDataType::String),
        ];

        let schema = SchemaBuilder::build(EntityKind::Datafile, &definitions);

        assert_eq!(schema.len(), 3);
        assert_eq!(schema.get("datafile_energy"), Some(ValueKind::Numeric));
        assert_eq!(schema.get("datafile_collected"), Some(ValueKind::DateTime));
        assert_eq!(schema.get("datafile_detector"), Some(ValueKind::Text));
    }

    #[test]
    fn test_build_is_deterministic() {
        let definitions = vec![
            definition("b", EntityKind::Dataset, ParameterDataType::Numeric),
            definition("a", EntityKind::Dataset, ParameterDataType::String),
        ];
        let mut reversed = definitions.clone();
        reversed.reverse();

        let first = SchemaBuilder::build(EntityKind::Dataset, &definitions);
        let second = SchemaBuilder::build(EntityKind::Dataset, &definitions);
        let third = SchemaBuilder::build(EntityKind::Dataset, &reversed);

        assert_eq!(first, second);
        assert_eq!(first, third);
    }

    #[test]
    fn test_build_ignores_other_kinds_and_unsearchable() {
        let mut hidden = definition("hidden", EntityKind::Experiment, ParameterDataType::String);
        hidden.is_searchable = false;
        let definitions = vec![
            definition("beamline", EntityKind::Experiment, ParameterDataType::String),
            definition("energy", EntityKind::Datafile, ParameterDataType::Numeric),
            hidden,
        ];

        let schema = SchemaBuilder::build(EntityKind::Experiment, &definitions);

        let names: Vec<&str> = schema.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["experiment_beamline"]);
    }

    #[test]
    fn test_build_duplicate_name_last_wins() {
        let definitions = vec![
            definition("run", EntityKind::Dataset, ParameterDataType::String),
            definition("run", EntityKind::Dataset, ParameterDataType::Numeric),
        ];

        let schema = SchemaBuilder::build(EntityKind::Dataset, &definitions);

        assert_eq!(schema.len(), 1);
        assert_eq!(schema.get("dataset_run"), Some(ValueKind::Numeric));
    }

    #[test]
    fn test_empty_catalog_gives_fixed_fields_only() {
        let schema = SchemaBuilder::index_schema(EntityKind::Datafile, &[]);
        assert!(schema.parameters.is_empty());
        assert_eq!(schema, IndexSchema::without_parameters(EntityKind::Datafile));
    }

    #[tokio::test]
    async fn test_registry_refresh_picks_up_new_parameters() {
        let store = Arc::new(InMemoryStore::new());
        let registry = SchemaRegistry::load(ParameterCatalog::new(store.clone())).await;
        assert!(registry.current().get(EntityKind::Dataset).parameters.is_empty());

        store.attach_parameter(
            4,
            ParameterValue::numeric(
                definition("temperature", EntityKind::Dataset, ParameterDataType::Numeric),
                4.2,
            ),
        );

        let before = registry.current();
        let (after, changed) = registry.refresh().await;

        assert!(changed);
        assert!(before.get(EntityKind::Dataset).parameters.is_empty());
        assert!(after.get(EntityKind::Dataset).parameters.contains("dataset_temperature"));
        assert_eq!(registry.current(), after);

        let (_, changed) = registry.refresh().await;
        assert!(!changed);
    }

    #[tokio::test]
    async fn test_registry_with_unavailable_store_is_minimal() {
        let store = Arc::new(InMemoryStore::new());
        store.attach_parameter(
            1,
            ParameterValue::string(
                definition("beamline", EntityKind::Experiment, ParameterDataType::String),
                "BL-4",
            ),
        );
        store.set_unavailable(true);

        let registry = SchemaRegistry::load(ParameterCatalog::new(store)).await;

        assert_eq!(*registry.current(), SchemaSet::minimal());
    }
}

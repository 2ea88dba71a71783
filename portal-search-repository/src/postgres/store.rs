use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use portal_search_shared::{
    DatafileRecord, DatasetRecord, EntityKind, ExperimentRecord, ParameterDataType,
    ParameterDefinition, ParameterValue,
};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{debug, info};

use super::tables::{self, parameter_tables};
use crate::errors::StoreError;
use crate::interfaces::{EntityStore, MetadataCatalogStore};
use crate::types::ParameterUsage;
use crate::utils::sole_value;

const MAX_CONNECTIONS: u32 = 10;
const ACQUIRE_TIMEOUT_SECS: u64 = 5;

#[derive(sqlx::FromRow)]
struct ParameterUsageRow {
    name: String,
    full_name: Option<String>,
    units: Option<String>,
    data_type: i32,
    is_searchable: bool,
    value_count: i64,
}

#[derive(sqlx::FromRow)]
struct ParameterValueRow {
    name: String,
    full_name: Option<String>,
    units: Option<String>,
    data_type: i32,
    is_searchable: bool,
    string_value: Option<String>,
    numerical_value: Option<f64>,
    datetime_value: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow)]
struct ExperimentRow {
    id: i64,
    title: String,
    description: Option<String>,
    institution_name: Option<String>,
    created_by: String,
    created_time: DateTime<Utc>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    update_time: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct DatasetRow {
    id: i64,
    experiment_id: i64,
    description: Option<String>,
}

#[derive(sqlx::FromRow)]
struct DatafileRow {
    id: i64,
    dataset_id: i64,
    filename: String,
}

/// Empty catalog text columns mean "not set".
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

fn definition(
    kind: EntityKind,
    name: String,
    full_name: Option<String>,
    units: Option<String>,
    data_type: i32,
    is_searchable: bool,
) -> ParameterDefinition {
    ParameterDefinition {
        name,
        entity_kind: kind,
        data_type: ParameterDataType::from_code(data_type),
        is_searchable,
        full_name: non_empty(full_name),
        units: non_empty(units),
    }
}

impl ParameterValueRow {
    fn into_value(self, kind: EntityKind) -> ParameterValue {
        ParameterValue {
            definition: definition(
                kind,
                self.name,
                self.full_name,
                self.units,
                self.data_type,
                self.is_searchable,
            ),
            numeric_value: self.numerical_value,
            datetime_value: self.datetime_value,
            string_value: self.string_value,
        }
    }
}

fn parameter_usage_sql(kind: EntityKind) -> String {
    let t = parameter_tables(kind);
    format!(
        r#"SELECT pn.name, pn.full_name, pn.units, pn.data_type, pn.is_searchable,
                  COUNT(p.id) AS value_count
           FROM {names} pn
           JOIN {parameter} p ON p.name_id = pn.id
           GROUP BY pn.id, pn.name, pn.full_name, pn.units, pn.data_type, pn.is_searchable
           ORDER BY pn.name, pn.id"#,
        names = tables::PARAMETER_NAME,
        parameter = t.parameter,
    )
}

fn searchable_parameters_sql(kind: EntityKind, by_name: bool) -> String {
    let t = parameter_tables(kind);
    let name_filter = if by_name { "AND pn.name = $2" } else { "" };
    format!(
        r#"SELECT pn.name, pn.full_name, pn.units, pn.data_type, pn.is_searchable,
                  p.string_value, p.numerical_value::float8 AS numerical_value, p.datetime_value
           FROM {parameter} p
           JOIN {parameter_set} ps ON p.parameterset_id = ps.id
           JOIN {names} pn ON p.name_id = pn.id
           WHERE ps.{entity_column} = $1 AND pn.is_searchable = TRUE {name_filter}
           ORDER BY p.id"#,
        parameter = t.parameter,
        parameter_set = t.parameter_set,
        names = tables::PARAMETER_NAME,
        entity_column = t.entity_column,
        name_filter = name_filter,
    )
}

/// Store reading the portal's PostgreSQL database.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect to the database, failing if it cannot be reached.
    pub async fn new(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
            .connect(database_url)
            .await?;

        info!("Connected to portal database");
        Ok(Self { pool })
    }

    /// Create a store whose connections are opened on first use.
    ///
    /// Only a malformed URL fails here. An unreachable database surfaces later, as
    /// [`StoreError::Unavailable`] from the first query.
    pub fn connect_lazy(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
            .connect_lazy(database_url)?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn parameter_values(
        &self,
        kind: EntityKind,
        id: i64,
    ) -> Result<Vec<ParameterValue>, StoreError> {
        let rows: Vec<ParameterValueRow> =
            sqlx::query_as(&searchable_parameters_sql(kind, false))
                .bind(id)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(|row| row.into_value(kind)).collect())
    }
}

#[async_trait]
impl MetadataCatalogStore for PostgresStore {
    async fn parameter_usage(&self, kind: EntityKind) -> Result<Vec<ParameterUsage>, StoreError> {
        let rows: Vec<ParameterUsageRow> = sqlx::query_as(&parameter_usage_sql(kind))
            .fetch_all(&self.pool)
            .await?;

        debug!(kind = %kind, count = rows.len(), "Loaded parameter usage");

        Ok(rows
            .into_iter()
            .map(|row| {
                ParameterUsage::new(
                    definition(
                        kind,
                        row.name,
                        row.full_name,
                        row.units,
                        row.data_type,
                        row.is_searchable,
                    ),
                    u64::try_from(row.value_count).unwrap_or(0),
                )
            })
            .collect())
    }
}

#[async_trait]
impl EntityStore for PostgresStore {
    async fn experiment(&self, id: i64) -> Result<ExperimentRecord, StoreError> {
        let sql = format!(
            r#"SELECT e.id::bigint AS id, e.title, e.description, e.institution_name,
                      u.username AS created_by, e.created_time, e.start_time, e.end_time,
                      e.update_time
               FROM {experiment} e
               JOIN {user} u ON u.id = e.created_by_id
               WHERE e.id = $1"#,
            experiment = tables::EXPERIMENT,
            user = tables::USER,
        );

        let row: ExperimentRow = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found(EntityKind::Experiment, id))?;

        Ok(ExperimentRecord {
            id: row.id,
            title: row.title,
            description: row.description.unwrap_or_default(),
            institution_name: row.institution_name.unwrap_or_default(),
            created_by: row.created_by,
            created_time: row.created_time,
            start_time: row.start_time,
            end_time: row.end_time,
            update_time: row.update_time,
        })
    }

    async fn dataset(&self, id: i64) -> Result<DatasetRecord, StoreError> {
        let sql = format!(
            "SELECT id::bigint AS id, experiment_id::bigint AS experiment_id, description FROM {} WHERE id = $1",
            tables::DATASET
        );

        let row: DatasetRow = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found(EntityKind::Dataset, id))?;

        Ok(DatasetRecord {
            id: row.id,
            experiment_id: row.experiment_id,
            description: row.description.unwrap_or_default(),
        })
    }

    async fn datafile(&self, id: i64) -> Result<DatafileRecord, StoreError> {
        let sql = format!(
            "SELECT id::bigint AS id, dataset_id::bigint AS dataset_id, filename FROM {} WHERE id = $1",
            tables::DATAFILE
        );

        let row: DatafileRow = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found(EntityKind::Datafile, id))?;

        Ok(DatafileRecord {
            id: row.id,
            dataset_id: row.dataset_id,
            filename: row.filename,
        })
    }

    async fn experiment_authors(&self, experiment_id: i64) -> Result<Vec<String>, StoreError> {
        let sql = format!(
            r#"SELECT author FROM {} WHERE experiment_id = $1 ORDER BY "order", id"#,
            tables::AUTHOR_EXPERIMENT
        );

        let authors: Vec<String> = sqlx::query_scalar(&sql)
            .bind(experiment_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(authors)
    }

    async fn searchable_parameters(
        &self,
        kind: EntityKind,
        id: i64,
    ) -> Result<Vec<ParameterValue>, StoreError> {
        self.parameter_values(kind, id).await
    }

    async fn find_searchable_parameter(
        &self,
        experiment_id: i64,
        name: &str,
    ) -> Result<Option<ParameterValue>, StoreError> {
        // Two rows are enough to tell a single value from an ambiguous one.
        let sql = format!(
            "{} LIMIT 2",
            searchable_parameters_sql(EntityKind::Experiment, true)
        );

        let rows: Vec<ParameterValueRow> = sqlx::query_as(&sql)
            .bind(experiment_id)
            .bind(name)
            .fetch_all(&self.pool)
            .await?;

        let values = rows
            .into_iter()
            .map(|row| row.into_value(EntityKind::Experiment))
            .collect();
        Ok(sole_value(values, experiment_id, name))
    }

    async fn list_ids(&self, kind: EntityKind) -> Result<Vec<i64>, StoreError> {
        let sql = format!(
            "SELECT id::bigint FROM {} ORDER BY id",
            parameter_tables(kind).entity
        );

        let ids: Vec<i64> = sqlx::query_scalar(&sql).fetch_all(&self.pool).await?;
        Ok(ids)
    }
}

//! Entity records read from the portal database.
//!
//! These are read-only inputs to document assembly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An experiment, the root of the entity hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRecord {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub institution_name: String,
    /// Username of the creating user.
    pub created_by: String,
    pub created_time: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub update_time: DateTime<Utc>,
}

/// A dataset, owned by one experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub id: i64,
    pub experiment_id: i64,
    pub description: String,
}

/// A datafile, owned by one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatafileRecord {
    pub id: i64,
    pub dataset_id: i64,
    pub filename: String,
}

//! The three kinds of portal entities that are indexed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of entity a document, parameter or schema belongs to.
///
/// Datafiles belong to one dataset, datasets belong to one experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Experiment,
    Dataset,
    Datafile,
}

impl EntityKind {
    /// All kinds, in parent-to-child order.
    pub const ALL: [EntityKind; 3] = [
        EntityKind::Experiment,
        EntityKind::Dataset,
        EntityKind::Datafile,
    ];

    /// Prefix used for every field name owned by this kind (e.g. `dataset_energy`).
    pub fn prefix(&self) -> &'static str {
        match self {
            EntityKind::Experiment => "experiment",
            EntityKind::Dataset => "dataset",
            EntityKind::Datafile => "datafile",
        }
    }

    /// Build the field name for a parameter owned by this kind.
    pub fn field_name(&self, parameter_name: &str) -> String {
        format!("{}_{}", self.prefix(), parameter_name)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "experiment" => Ok(EntityKind::Experiment),
            "dataset" => Ok(EntityKind::Dataset),
            "datafile" | "dataset_file" => Ok(EntityKind::Datafile),
            other => Err(format!("unknown entity kind '{}'", other)),
        }
    }
}

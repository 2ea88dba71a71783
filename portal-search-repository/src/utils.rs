//! Utility functions for the search indexer repository.

use portal_search_shared::ParameterValue;
use tracing::info;

use crate::errors::SearchIndexError;

/// The only value a soft-parameter lookup matched.
///
/// Several matches are as unusable as none: picking one would disagree with the
/// structured field built from all of them.
pub(crate) fn sole_value(
    mut values: Vec<ParameterValue>,
    experiment_id: i64,
    name: &str,
) -> Option<ParameterValue> {
    match values.len() {
        0 => None,
        1 => values.pop(),
        _ => {
            info!(
                experiment_id = experiment_id,
                parameter = name,
                "Several values for a free-text parameter, ignoring them"
            );
            None
        }
    }
}

/// Check that a field name can be used in an index mapping.
///
/// Parameter names come from the catalog, so they are validated before they reach
/// the search backend. Only alphanumeric characters, underscores and hyphens are allowed.
pub fn validate_field_name(name: &str) -> Result<(), SearchIndexError> {
    if name.is_empty() {
        return Err(SearchIndexError::validation("Field names cannot be empty"));
    }

    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        return Err(SearchIndexError::validation(format!(
            "Field name '{}' contains invalid characters",
            name
        )));
    }

    Ok(())
}

//! Value classification and extraction.
//!
//! [`classify`] is the single source of truth for which value slot a parameter
//! uses. The schema builder uses it to type a field and the extractor uses it to
//! read the value, so a document field always has the kind its schema declares.

use chrono::SecondsFormat;
use portal_search_shared::{FieldValue, ParameterDefinition, ParameterValue, ValueKind};

/// Value kind of a parameter, from its declared data type.
pub fn classify(definition: &ParameterDefinition) -> ValueKind {
    if definition.is_numeric() {
        ValueKind::Numeric
    } else if definition.is_datetime() {
        ValueKind::DateTime
    } else {
        ValueKind::Text
    }
}

/// Read the active slot of a parameter value.
///
/// An empty active slot yields [`FieldValue::Null`]; other slots are ignored even
/// when populated.
pub fn extract(value: &ParameterValue) -> FieldValue {
    match classify(&value.definition) {
        ValueKind::Numeric => value
            .numeric_value
            .map(FieldValue::Number)
            .unwrap_or(FieldValue::Null),
        ValueKind::DateTime => value
            .datetime_value
            .map(FieldValue::DateTime)
            .unwrap_or(FieldValue::Null),
        ValueKind::Text => value
            .string_value
            .clone()
            .map(FieldValue::Text)
            .unwrap_or(FieldValue::Null),
    }
}

/// Render an extracted value for the free-text field.
///
/// Returns `None` for null and empty values, which contribute nothing to the text.
pub fn stringify(value: &FieldValue) -> Option<String> {
    let rendered = match value {
        FieldValue::Text(s) => s.clone(),
        FieldValue::Integer(i) => i.to_string(),
        FieldValue::Number(n) => n.to_string(),
        FieldValue::DateTime(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        FieldValue::MultiText(values) => values.join(" "),
        FieldValue::Null => return None,
    };

    if rendered.is_empty() {
        None
    } else {
        Some(rendered)
    }
}

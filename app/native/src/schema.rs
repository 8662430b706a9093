//! JSON Schema generation for the configuration file.

use crate::config::TintConfig;

/// Generates a JSON Schema for the Paneltint configuration.
///
/// The schema includes all configuration options with their types,
/// descriptions, and default values.
#[must_use]
pub fn generate_schema() -> schemars::Schema {
    let mut schema = schemars::schema_for!(TintConfig);

    // Add $id for proper schema identification
    if let Some(obj) = schema.as_object_mut() {
        obj.insert(
            "$id".to_string(),
            serde_json::json!(
                "https://raw.githubusercontent.com/paneltint/paneltint/main/paneltint.schema.json"
            ),
        );
    }

    schema
}

/// Generates a pretty-printed JSON Schema string for the configuration.
#[must_use]
pub fn generate_schema_json() -> String {
    let schema = generate_schema();
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

//! # Inspect Subcommand

use clap::Args;
use serde_json::{json, Value};

use crate::schema::SchemaArgs;

/// Arguments for the inspect subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub schema: SchemaArgs,
}

/// Summarize the generated model type: its name, declared defaults, and the
/// properties materialized as nested models (with their own type names).
pub fn run(args: &InspectArgs) -> anyhow::Result<Value> {
    let model_type = args.schema.model_type()?;

    let mut nested = serde_json::Map::new();
    for key in model_type.object_properties() {
        if let Some(nested_type) = model_type.nested_type(key)? {
            nested.insert(key.to_string(), json!(nested_type.name()));
        }
    }

    Ok(json!({
        "name": model_type.name(),
        "defaults": model_type.defaults(),
        "object_properties": nested,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::fixtures::{schema_args, write_json};

    #[test]
    fn test_summary_lists_defaults_and_nested_types() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write_json(
            dir.path(),
            "order.json",
            &json!({
                "name": "Order",
                "properties": {
                    "quantity": {"type": "integer", "default": 1},
                    "customer": {"name": "Customer", "type": "object"},
                    "shipping": {"$ref": "#/definitions/address"}
                },
                "definitions": {"address": {"type": ["object", "null"]}}
            }),
        );
        let summary = run(&InspectArgs {
            schema: schema_args(schema, None),
        })
        .unwrap();

        assert_eq!(
            summary,
            json!({
                "name": "Order",
                "defaults": {"quantity": 1},
                "object_properties": {"customer": "Customer", "shipping": "Model"}
            })
        );
    }
}

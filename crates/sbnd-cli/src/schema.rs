//! # Schema Arguments
//!
//! Flags shared by every subcommand for locating the root schema and the
//! documents its `$ref`s point into.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use sbnd_model::{ModelFactory, ModelType};
use sbnd_schema::{load_document, SchemaRegistry, DEFAULT_BASE_URI};
use serde_json::Value;

/// Where to find the schema a model type is generated from.
#[derive(Args, Debug, Clone)]
pub struct SchemaArgs {
    /// Root schema file (JSON or YAML).
    #[arg(long)]
    pub schema: PathBuf,

    /// Directory of `*.schema.json` / `*.schema.yaml` documents that
    /// external `$ref`s resolve against.
    #[arg(long, env = "SBND_SCHEMA_DIR")]
    pub schema_dir: Option<PathBuf>,

    /// Model type name, overriding the schema's `name`.
    #[arg(long)]
    pub name: Option<String>,
}

impl SchemaArgs {
    /// Load the root schema, build its registry, and create the model type.
    pub fn model_type(&self) -> anyhow::Result<ModelType> {
        let root = load_document(&self.schema)
            .with_context(|| format!("loading schema {}", self.schema.display()))?;

        let mut registry = match &self.schema_dir {
            Some(dir) => SchemaRegistry::from_dir(dir)
                .with_context(|| format!("loading schema directory {}", dir.display()))?,
            None => SchemaRegistry::new(),
        };
        let base = root
            .get("$id")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_BASE_URI)
            .to_string();
        registry.insert(base.clone(), root.clone());
        registry.set_base_uri(base);

        let mut factory = ModelFactory::new().with_shared_resolver(Arc::new(registry));
        if let Some(name) = &self.name {
            factory = factory.with_name(name.clone());
        }
        let model_type = factory
            .create(&root)
            .with_context(|| format!("creating model type from {}", self.schema.display()))?;

        tracing::info!(model = %model_type.name(), schema = %self.schema.display(), "model type ready");
        Ok(model_type)
    }
}

/// Load a JSON or YAML instance document.
pub fn load_instance(path: &Path) -> anyhow::Result<Value> {
    load_document(path).with_context(|| format!("loading document {}", path.display()))
}

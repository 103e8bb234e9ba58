//! # Patch Subcommand
//!
//! Instantiates a model from an original document, applies an update as a
//! single validated bulk update, and prints the JSON Patch from the original
//! to the result.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde_json::Value;

use crate::schema::{load_instance, SchemaArgs};

/// Arguments for the patch subcommand.
#[derive(Args, Debug)]
pub struct PatchArgs {
    #[command(flatten)]
    pub schema: SchemaArgs,

    /// Document the model is constructed from.
    pub original: PathBuf,

    /// Object whose entries are assigned in one update.
    pub update: PathBuf,
}

/// Returns the pretty-printed JSON Patch.
pub fn run(args: &PatchArgs) -> anyhow::Result<String> {
    let model_type = args.schema.model_type()?;

    let original = load_instance(&args.original)?;
    let mut model = model_type
        .instantiate(original)
        .with_context(|| format!("constructing model from {}", args.original.display()))?;

    let Value::Object(entries) = load_instance(&args.update)? else {
        anyhow::bail!("update {} must be a JSON object", args.update.display());
    };
    model
        .update(entries)
        .with_context(|| format!("applying update {}", args.update.display()))?;

    Ok(serde_json::to_string_pretty(&model.patch_document())?)
}

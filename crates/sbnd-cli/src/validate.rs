//! # Validate Subcommand
//!
//! Instantiates a model from every document. A document is valid exactly
//! when construction succeeds, nested models included.

use std::fmt;
use std::path::PathBuf;

use clap::Args;

use crate::schema::{load_instance, SchemaArgs};

/// Arguments for the validate subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub schema: SchemaArgs,

    /// Documents to validate (JSON or YAML).
    #[arg(required = true)]
    pub documents: Vec<PathBuf>,
}

/// Result of validating one document.
#[derive(Debug)]
pub struct DocumentOutcome {
    pub path: PathBuf,
    /// Why the document was rejected; `None` when it is valid.
    pub error: Option<String>,
}

impl DocumentOutcome {
    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }
}

impl fmt::Display for DocumentOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            None => write!(f, "OK   {}", self.path.display()),
            Some(error) => write!(f, "FAIL {}: {error}", self.path.display()),
        }
    }
}

/// Validate every document against the model type built from `args.schema`.
///
/// Unreadable documents are reported as failures; only a schema that cannot
/// be loaded aborts the run.
pub fn run(args: &ValidateArgs) -> anyhow::Result<Vec<DocumentOutcome>> {
    let model_type = args.schema.model_type()?;

    let outcomes = args
        .documents
        .iter()
        .map(|path| {
            let error = load_instance(path)
                .and_then(|document| {
                    model_type
                        .instantiate(document)
                        .map_err(anyhow::Error::from)
                })
                .err()
                .map(|e| format!("{e:#}"));
            match &error {
                None => tracing::debug!(path = %path.display(), "document valid"),
                Some(reason) => tracing::warn!(path = %path.display(), %reason, "document invalid"),
            }
            DocumentOutcome {
                path: path.clone(),
                error,
            }
        })
        .collect();
    Ok(outcomes)
}

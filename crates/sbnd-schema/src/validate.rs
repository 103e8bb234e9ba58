//! # Schema Validation
//!
//! Compiles JSON Schemas into reusable validators and reports violations in
//! structured form.
//!
//! ## Reference Resolution
//!
//! Internal `$ref`s of the form `#/definitions/<name>` are resolved by the
//! jsonschema crate natively. Every other reference goes through the
//! installed retriever:
//!
//! - with a [`Resolver`], the retriever asks it for the referenced document;
//! - without one, the retriever refuses, so a schema that needs external
//!   documents fails to compile instead of reaching for the network.

use std::fmt;
use std::sync::Arc;

use jsonschema::{Draft, Retrieve, Uri, ValidationOptions, Validator};
use sbnd_core::Resolver;
use serde_json::Value;
use thiserror::Error;

/// Error during schema compilation, loading, or validation.
#[derive(Error, Debug)]
pub enum SchemaValidationError {
    /// The document did not conform to the schema.
    #[error("validation failed against schema '{schema_name}':\n{violations}")]
    ValidationFailed {
        /// Label of the schema that was validated against.
        schema_name: String,
        /// Structured list of individual violations.
        violations: ValidationViolations,
    },

    /// The schema file could not be loaded.
    #[error("schema load error for '{schema_name}': {reason}")]
    SchemaLoadError {
        /// Schema filename or identifier.
        schema_name: String,
        /// Reason the schema could not be loaded.
        reason: String,
    },

    /// The document file could not be loaded or parsed.
    #[error("document load error for '{path}': {reason}")]
    DocumentLoadError {
        /// Path to the document that failed to load.
        path: String,
        /// Reason the document could not be loaded.
        reason: String,
    },

    /// The compiled validator could not be built (e.g., invalid schema).
    #[error("validator build error for schema '{schema_name}': {reason}")]
    ValidatorBuildError {
        /// Schema label.
        schema_name: String,
        /// Reason the validator could not be built.
        reason: String,
    },

    /// IO error reading schema or document.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single validation violation with structured context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON Pointer path to the violating field in the instance.
    pub instance_path: String,
    /// JSON Pointer path within the schema that triggered the error.
    pub schema_path: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl Violation {
    /// A violation not tied to any particular location.
    pub fn at_root(message: impl Into<String>) -> Self {
        Self {
            instance_path: String::new(),
            schema_path: String::new(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "  (root): {}", self.message)
        } else {
            write!(f, "  {}: {}", self.instance_path, self.message)
        }
    }
}

/// Collection of validation violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationViolations {
    violations: Vec<Violation>,
}

impl ValidationViolations {
    /// Wrap a list of violations.
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    /// Returns the number of violations.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Returns true if there are no violations.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Returns a slice of all violations.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Consumes self and returns the inner Vec.
    pub fn into_inner(self) -> Vec<Violation> {
        self.violations
    }

    /// Violation messages joined on one line, for embedding in other errors.
    pub fn summary(&self) -> String {
        self.violations
            .iter()
            .map(|v| {
                if v.instance_path.is_empty() {
                    v.message.clone()
                } else {
                    format!("{}: {}", v.instance_path, v.message)
                }
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl From<Violation> for ValidationViolations {
    fn from(violation: Violation) -> Self {
        Self::new(vec![violation])
    }
}

impl fmt::Display for ValidationViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

/// A validator compiled against one schema.
pub trait InstanceValidator: Send + Sync {
    /// Accept `instance` or report every violation found.
    fn validate(&self, instance: &Value) -> Result<(), ValidationViolations>;
}

/// Compiles schemas into [`InstanceValidator`]s.
pub trait ValidatorFactory: Send + Sync + fmt::Debug {
    /// Compile `schema`, resolving external references through `resolver`.
    fn compile(
        &self,
        schema: &Value,
        resolver: Option<Arc<dyn Resolver>>,
    ) -> Result<Box<dyn InstanceValidator>, SchemaValidationError>;
}

/// Human-readable label for a schema: its `$id`, else `title`, else `name`.
pub fn schema_label(schema: &Value) -> String {
    ["$id", "title", "name"]
        .iter()
        .find_map(|key| schema.get(*key).and_then(Value::as_str))
        .unwrap_or("<inline>")
        .to_string()
}

/// Retriever that delegates external `$ref` documents to a [`Resolver`].
struct ResolverRetriever {
    resolver: Arc<dyn Resolver>,
}

impl Retrieve for ResolverRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let resolved = self.resolver.resolve(uri.as_str())?;
        Ok(resolved.fragment)
    }
}

/// Retriever installed when no resolver is bound: refuses every lookup.
struct OfflineRetriever;

impl Retrieve for OfflineRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        Err(format!("no resolver bound; refusing to retrieve '{}'", uri.as_str()).into())
    }
}

/// Compiled `jsonschema` validator.
struct CompiledSchema {
    validator: Validator,
}

impl InstanceValidator for CompiledSchema {
    fn validate(&self, instance: &Value) -> Result<(), ValidationViolations> {
        let errors: Vec<Violation> = self
            .validator
            .iter_errors(instance)
            .map(|e| Violation {
                instance_path: e.instance_path.to_string(),
                schema_path: e.schema_path.to_string(),
                message: e.to_string(),
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationViolations::new(errors))
        }
    }
}

/// [`ValidatorFactory`] backed by the `jsonschema` crate.
///
/// The draft is detected from the schema's `$schema` keyword unless pinned
/// with [`JsonSchemaFactory::with_draft`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaFactory {
    draft: Option<Draft>,
}

impl JsonSchemaFactory {
    /// Factory with draft auto-detection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin every compiled schema to `draft`.
    pub fn with_draft(mut self, draft: Draft) -> Self {
        self.draft = Some(draft);
        self
    }

    /// The pinned draft, if any.
    pub fn draft(&self) -> Option<Draft> {
        self.draft
    }

    fn build_options(&self, resolver: Option<Arc<dyn Resolver>>) -> ValidationOptions {
        let mut opts = jsonschema::options();
        if let Some(draft) = self.draft {
            opts.with_draft(draft);
        }
        match resolver {
            Some(resolver) => {
                opts.with_retriever(ResolverRetriever { resolver });
            }
            None => {
                opts.with_retriever(OfflineRetriever);
            }
        }
        opts
    }

    /// Validate `instance` against `schema` in one shot.
    ///
    /// Compiles a fresh validator on every call; hold on to the result of
    /// [`ValidatorFactory::compile`] when validating repeatedly.
    pub fn validate_document(
        &self,
        instance: &Value,
        schema: &Value,
        resolver: Option<Arc<dyn Resolver>>,
    ) -> Result<(), SchemaValidationError> {
        let validator = self.compile(schema, resolver)?;
        validator
            .validate(instance)
            .map_err(|violations| SchemaValidationError::ValidationFailed {
                schema_name: schema_label(schema),
                violations,
            })
    }
}

impl ValidatorFactory for JsonSchemaFactory {
    fn compile(
        &self,
        schema: &Value,
        resolver: Option<Arc<dyn Resolver>>,
    ) -> Result<Box<dyn InstanceValidator>, SchemaValidationError> {
        let opts = self.build_options(resolver);
        let validator = opts.build(schema).map_err(|e| {
            SchemaValidationError::ValidatorBuildError {
                schema_name: schema_label(schema),
                reason: e.to_string(),
            }
        })?;
        tracing::trace!(schema = %schema_label(schema), "compiled schema validator");
        Ok(Box::new(CompiledSchema { validator }))
    }
}

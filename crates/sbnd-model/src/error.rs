//! # Error Types: Model Construction & Mutation
//!
//! - Construction-time validation failures are [`ModelError::InvalidValue`]:
//!   no partially built model ever exists.
//! - Rejected mutations are [`InvalidOperation`]s carrying the key, the
//!   offending value where there is one, and the validator's reason.
//! - Reads of absent keys without a schema default are
//!   [`ModelError::MissingKey`].

use sbnd_core::ResolveError;
use sbnd_schema::{SchemaValidationError, ValidationViolations};
use serde_json::Value;
use thiserror::Error;

/// Top-level error type for model types and instances.
#[derive(Error, Debug)]
pub enum ModelError {
    /// The data a model was constructed from does not satisfy its schema.
    #[error("invalid value for model '{model}': {}", violations.summary())]
    InvalidValue {
        /// Name of the model type.
        model: String,
        /// Violations reported by the validator.
        violations: ValidationViolations,
    },

    /// A mutation or lookup the model refuses to perform.
    #[error(transparent)]
    InvalidOperation(#[from] InvalidOperation),

    /// Key is neither stored nor defaulted by the schema.
    #[error("missing key '{0}'")]
    MissingKey(String),

    /// The schema could not be compiled into a validator.
    #[error(transparent)]
    Schema(#[from] SchemaValidationError),

    /// The patch document could not be serialized.
    #[error("patch serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<ResolveError> for ModelError {
    fn from(err: ResolveError) -> Self {
        Self::InvalidOperation(InvalidOperation::Resolve(err))
    }
}

/// An operation rejected by a validating model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidOperation {
    /// Assigning `value` to `key` would make the model invalid.
    #[error("unable to set '{key}' to {value}: {reason}")]
    Set {
        /// The key being assigned.
        key: String,
        /// The rejected value.
        value: Value,
        /// Validator diagnostic.
        reason: String,
    },

    /// Removing `key` would make the model invalid.
    #[error("unable to delete '{key}': {reason}")]
    Delete {
        /// The key being removed.
        key: String,
        /// Validator diagnostic.
        reason: String,
    },

    /// The merged bulk update would make the model invalid.
    #[error("unable to update: {reason}")]
    Update {
        /// Validator diagnostic.
        reason: String,
    },

    /// The operation cannot be expressed as a single validated mutation.
    #[error("'{operation}' is not supported on a validating model")]
    Unsupported {
        /// Name of the refused operation.
        operation: &'static str,
    },

    /// A `$ref` in the schema could not be followed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

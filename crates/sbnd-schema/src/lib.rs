//! # sbnd-schema: Validation, Resolution & Loading
//!
//! The external collaborators a validating model relies on, kept behind
//! small traits so the model crate never talks to `jsonschema` directly.
//!
//! ## Validation (`validate`)
//!
//! - [`ValidatorFactory`] compiles a schema (plus an optional
//!   [`Resolver`](sbnd_core::Resolver)) into an [`InstanceValidator`].
//! - [`JsonSchemaFactory`] is the default factory, backed by the `jsonschema`
//!   crate. Draft selection is left to `jsonschema` unless pinned.
//! - Failures carry structured [`Violation`]s: instance path, schema path,
//!   and message.
//!
//! ## Resolution (`registry`)
//!
//! [`SchemaRegistry`] is a [`Resolver`](sbnd_core::Resolver) over in-memory
//! documents keyed by URI. It doubles as the `jsonschema` retriever, so
//! external `$ref`s never trigger network requests.
//!
//! ## Loading (`loader`)
//!
//! [`load_document`] reads JSON or YAML by file extension.
//!
//! ## Crate Policy
//!
//! - Depends only on `sbnd-core` internally.
//! - Schema validation is a trust boundary: invalid documents are rejected
//!   with structured errors, never coerced.

pub mod loader;
pub mod registry;
pub mod validate;

pub use loader::{load_document, parse_document, DocumentFormat};
pub use registry::{SchemaRegistry, DEFAULT_BASE_URI};
pub use validate::{
    InstanceValidator, JsonSchemaFactory, SchemaValidationError, ValidationViolations,
    ValidatorFactory, Violation,
};

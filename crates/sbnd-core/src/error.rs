//! # Error Types: Reference Resolution
//!
//! Resolution errors are configuration errors: a schema that points at a
//! fragment nobody can produce, or a model built without the resolver its
//! schema needs. They fail loudly and are never silently passed through.

use thiserror::Error;

/// Error raised while following a `$ref` indirection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// A `$ref` was encountered but no resolver is bound.
    #[error("cannot follow $ref '{reference}': no resolver is bound")]
    NoResolver {
        /// The reference that could not be followed.
        reference: String,
    },

    /// The resolver does not know the referenced document or fragment.
    #[error("unresolvable $ref '{reference}': {reason}")]
    Unresolvable {
        /// The reference as written in the schema.
        reference: String,
        /// Why the resolver rejected it.
        reason: String,
    },

    /// The `$ref` value is not a string.
    #[error("$ref must be a string, found {found}")]
    InvalidReference {
        /// JSON rendering of the offending value.
        found: String,
    },

    /// A `$ref` chain revisited a canonical id.
    #[error("$ref cycle detected: {}", chain.join(" -> "))]
    Cycle {
        /// Canonical ids in traversal order, ending with the repeated one.
        chain: Vec<String>,
    },
}

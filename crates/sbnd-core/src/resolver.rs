//! # Resolver Seam
//!
//! A [`Resolver`] turns the string inside a `$ref` into the fragment it
//! points at. The core never mutates a resolver; one instance is shared by
//! every model type descended from a single factory call.
//!
//! Resolving the same reference twice must produce structurally equal
//! fragments. Nested model types are cached per property name on that
//! assumption.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::ResolveError;

/// The reserved key marking a reference indirection.
pub const REF_KEY: &str = "$ref";

/// The target of a resolved `$ref`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRef {
    /// Stable identifier of the fragment, typically `<document-uri>#<pointer>`.
    pub canonical_id: String,
    /// The referenced schema fragment.
    pub fragment: Value,
}

/// Maps a reference string to a canonical id and schema fragment.
pub trait Resolver: Send + Sync + fmt::Debug {
    /// Resolve `reference` as written in a `$ref`.
    fn resolve(&self, reference: &str) -> Result<ResolvedRef, ResolveError>;
}

impl<R: Resolver + ?Sized> Resolver for Arc<R> {
    fn resolve(&self, reference: &str) -> Result<ResolvedRef, ResolveError> {
        (**self).resolve(reference)
    }
}

impl<R: Resolver + ?Sized> Resolver for &R {
    fn resolve(&self, reference: &str) -> Result<ResolvedRef, ResolveError> {
        (**self).resolve(reference)
    }
}

/// Returns the `$ref` string carried by `fragment`, if any.
///
/// Only objects can carry a reference marker. A marker whose value is not a
/// string is rejected rather than ignored.
pub fn reference_of(fragment: &Value) -> Result<Option<&str>, ResolveError> {
    match fragment.get(REF_KEY) {
        None => Ok(None),
        Some(Value::String(reference)) => Ok(Some(reference.as_str())),
        Some(other) => Err(ResolveError::InvalidReference {
            found: other.to_string(),
        }),
    }
}

/// The document part of a reference or canonical id: everything before `#`.
///
/// Empty for fragment-only references such as `#/definitions/address`.
pub fn document_part(reference: &str) -> &str {
    reference
        .split_once('#')
        .map_or(reference, |(document, _)| document)
}

/// Rewrite every fragment-only `$ref` under `fragment` to point into
/// `document`.
///
/// A fragment lifted out of `document` keeps denoting the same sub-schemas
/// once it is embedded elsewhere.
pub fn rebase_fragment_refs(fragment: &mut Value, document: &str) {
    match fragment {
        Value::Object(map) => {
            for (key, value) in map.iter_mut() {
                match value {
                    Value::String(reference) if key == REF_KEY && reference.starts_with('#') => {
                        *reference = format!("{document}{reference}");
                    }
                    _ => rebase_fragment_refs(value, document),
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                rebase_fragment_refs(item, document);
            }
        }
        _ => {}
    }
}

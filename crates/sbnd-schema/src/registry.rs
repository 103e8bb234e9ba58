//! # Schema Registry
//!
//! In-memory [`Resolver`] over schema documents keyed by URI.
//!
//! ## Reference Forms
//!
//! - `#/pointer`: resolved against the base document (the root schema).
//! - `<uri>` / `<uri>#/pointer`: resolved against the registered document.
//! - `<file>.schema.json`: relative references fall back to matching the
//!   final path segment of registered URIs, so `address.schema.json`,
//!   `json-schema:///address.schema.json` and
//!   `https://example.com/schemas/address.schema.json` all find the same
//!   document.
//!
//! Canonical ids have the form `<document-uri>#<pointer>`, which keeps them
//! stable no matter how a reference was spelled.

use std::collections::HashMap;
use std::path::Path;

use sbnd_core::{ResolveError, ResolvedRef, Resolver};
use serde_json::Value;

use crate::loader::load_document;
use crate::validate::SchemaValidationError;

/// Base URI given to a root schema that carries no `$id`.
pub const DEFAULT_BASE_URI: &str = "urn:sbnd:root";

/// Schema documents addressable by URI.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    /// URI the fragment-only references (`#/...`) resolve against.
    base_uri: Option<String>,
    /// Map from URI to parsed document.
    documents: HashMap<String, Value>,
}

impl SchemaRegistry {
    /// An empty registry with no base document.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry whose base document is `root`.
    ///
    /// The root is registered under its `$id`, or [`DEFAULT_BASE_URI`] when it
    /// has none.
    pub fn with_root(root: Value) -> Self {
        let uri = root
            .get("$id")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_BASE_URI)
            .to_string();
        let mut registry = Self::new();
        registry.insert(uri.clone(), root);
        registry.base_uri = Some(uri);
        registry
    }

    /// Load every `*.schema.json`, `*.schema.yaml` and `*.schema.yml` file in
    /// `schema_dir`.
    ///
    /// Each document is registered under its filename and, when present, its
    /// `$id`.
    ///
    /// # Errors
    ///
    /// Returns `SchemaValidationError::SchemaLoadError` if the directory or
    /// any schema file cannot be read or parsed.
    pub fn from_dir(schema_dir: impl AsRef<Path>) -> Result<Self, SchemaValidationError> {
        let schema_dir = schema_dir.as_ref();
        let mut registry = Self::new();

        let entries = std::fs::read_dir(schema_dir).map_err(|e| {
            SchemaValidationError::SchemaLoadError {
                schema_name: schema_dir.display().to_string(),
                reason: format!("cannot read schema directory: {e}"),
            }
        })?;

        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let is_schema = [".schema.json", ".schema.yaml", ".schema.yml"]
                .iter()
                .any(|suffix| name.ends_with(suffix));
            if !is_schema {
                continue;
            }
            let value = load_document(&path).map_err(|e| SchemaValidationError::SchemaLoadError {
                schema_name: name.to_string(),
                reason: e.to_string(),
            })?;
            registry.insert(name.to_string(), value);
        }

        tracing::debug!(
            dir = %schema_dir.display(),
            documents = registry.len(),
            "loaded schema registry"
        );
        Ok(registry)
    }

    /// Register `document` under `uri`, and under its own `$id` if that differs.
    pub fn insert(&mut self, uri: impl Into<String>, document: Value) {
        let uri = uri.into();
        if let Some(id) = document.get("$id").and_then(Value::as_str) {
            let id = id.trim_end_matches('#');
            if id != uri {
                self.documents.insert(id.to_string(), document.clone());
            }
        }
        self.documents.insert(uri, document);
    }

    /// Make `uri` the document fragment-only references resolve against.
    pub fn set_base_uri(&mut self, uri: impl Into<String>) {
        self.base_uri = Some(uri.into());
    }

    /// The base document URI, if set.
    pub fn base_uri(&self) -> Option<&str> {
        self.base_uri.as_deref()
    }

    /// Number of registered URIs.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether no documents are registered.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Registered URIs, sorted alphabetically.
    pub fn uris(&self) -> Vec<&str> {
        let mut uris: Vec<&str> = self.documents.keys().map(String::as_str).collect();
        uris.sort();
        uris
    }

    /// Look up a document by URI, falling back to its final path segment.
    pub fn document(&self, uri: &str) -> Option<(&str, &Value)> {
        let uri = uri.trim_end_matches('#');
        if let Some((key, value)) = self.documents.get_key_value(uri) {
            return Some((key.as_str(), value));
        }

        let filename = uri.rsplit('/').next().unwrap_or(uri);
        if filename.is_empty() {
            return None;
        }
        let mut candidates: Vec<(&String, &Value)> = self
            .documents
            .iter()
            .filter(|(key, _)| key.rsplit('/').next() == Some(filename))
            .collect();
        candidates.sort_by(|a, b| a.0.cmp(b.0));
        candidates
            .into_iter()
            .next()
            .map(|(key, value)| (key.as_str(), value))
    }
}

impl Resolver for SchemaRegistry {
    fn resolve(&self, reference: &str) -> Result<ResolvedRef, ResolveError> {
        let (document_part, pointer) = reference.split_once('#').unwrap_or((reference, ""));

        let uri = if document_part.is_empty() {
            self.base_uri
                .as_deref()
                .ok_or_else(|| ResolveError::Unresolvable {
                    reference: reference.to_string(),
                    reason: "fragment-only reference but no base document is set".to_string(),
                })?
        } else {
            document_part
        };

        let (canonical_uri, document) =
            self.document(uri)
                .ok_or_else(|| ResolveError::Unresolvable {
                    reference: reference.to_string(),
                    reason: format!("no document registered for '{uri}'"),
                })?;

        let fragment = if pointer.is_empty() {
            document.clone()
        } else {
            document
                .pointer(pointer)
                .cloned()
                .ok_or_else(|| ResolveError::Unresolvable {
                    reference: reference.to_string(),
                    reason: format!("pointer '{pointer}' not found in '{canonical_uri}'"),
                })?
        };

        Ok(ResolvedRef {
            canonical_id: format!("{canonical_uri}#{pointer}"),
            fragment,
        })
    }
}

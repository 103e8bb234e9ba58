//! # Schema View: `$ref`-Following Lookups
//!
//! [`SchemaView`] presents a schema fragment as a plain key-lookup surface.
//! When the fragment is a `$ref` marker, lookups and key enumeration are
//! forwarded to the referenced fragment, following chains of references
//! until a concrete fragment is reached.
//!
//! ## Termination
//!
//! Each hop is identified by the resolver's canonical id. A chain that
//! revisits an id fails with [`ResolveError::Cycle`]. A marker that resolves
//! to a fragment structurally equal to itself (e.g. `{"$ref": "#"}` at the
//! document root) is treated as a self-reference: the view falls back to a
//! literal lookup on the marker fragment.
//!
//! Every value returned by [`SchemaView::get`] is itself a view bound to the
//! same resolver, so dereferencing composes through arbitrary nesting.

use std::borrow::Cow;

use serde_json::Value;

use crate::error::ResolveError;
use crate::resolver::{document_part, reference_of, Resolver};

/// Read-only projection of a schema fragment that dereferences `$ref`s.
#[derive(Debug, Clone)]
pub struct SchemaView<'a> {
    fragment: Cow<'a, Value>,
    resolver: Option<&'a dyn Resolver>,
}

impl<'a> SchemaView<'a> {
    /// View `fragment`, following references through `resolver`.
    pub fn new(fragment: &'a Value, resolver: Option<&'a dyn Resolver>) -> Self {
        Self {
            fragment: Cow::Borrowed(fragment),
            resolver,
        }
    }

    fn owned(fragment: Value, resolver: Option<&'a dyn Resolver>) -> Self {
        Self {
            fragment: Cow::Owned(fragment),
            resolver,
        }
    }

    /// The literal fragment, without dereferencing.
    pub fn as_value(&self) -> &Value {
        &self.fragment
    }

    /// Consume the view, returning the literal fragment.
    pub fn into_value(self) -> Value {
        self.fragment.into_owned()
    }

    /// The resolver this view follows references through.
    pub fn resolver(&self) -> Option<&'a dyn Resolver> {
        self.resolver
    }

    /// Whether the literal fragment carries a `$ref` marker.
    pub fn is_reference(&self) -> bool {
        matches!(reference_of(&self.fragment), Ok(Some(_)) | Err(_))
    }

    /// The fragment this view ultimately denotes.
    ///
    /// Borrows the literal fragment when it is not a reference (or is a
    /// self-reference); otherwise returns the end of the `$ref` chain.
    pub fn resolved(&self) -> Result<Cow<'_, Value>, ResolveError> {
        self.resolved_with_document().map(|(target, _)| target)
    }

    /// Like [`SchemaView::resolved`], also reporting the document the chain
    /// ends in when some hop left the starting document.
    ///
    /// The document is the part before `#` of the last hop's canonical id.
    /// Fragment-only `$ref`s inside the target are relative to it.
    pub fn resolved_with_document(
        &self,
    ) -> Result<(Cow<'_, Value>, Option<String>), ResolveError> {
        let mut current: Cow<'_, Value> = Cow::Borrowed(&*self.fragment);
        let mut chain: Vec<String> = Vec::new();
        let mut document: Option<String> = None;

        while let Some(reference) = reference_of(&current)? {
            let resolver = self.resolver.ok_or_else(|| ResolveError::NoResolver {
                reference: reference.to_string(),
            })?;
            let crossed = document.is_some() || !document_part(reference).is_empty();
            let resolved = resolver.resolve(reference)?;

            if resolved.fragment == *current {
                break;
            }
            if chain.contains(&resolved.canonical_id) {
                chain.push(resolved.canonical_id);
                return Err(ResolveError::Cycle { chain });
            }
            if crossed {
                let target = document_part(&resolved.canonical_id);
                if !target.is_empty() {
                    document = Some(target.to_string());
                }
            }
            chain.push(resolved.canonical_id);
            current = Cow::Owned(resolved.fragment);
        }

        Ok((current, document))
    }

    /// Look up `key` on the dereferenced fragment.
    ///
    /// Returns `Ok(None)` when the key is absent or the fragment is not an
    /// object.
    pub fn get(&self, key: &str) -> Result<Option<SchemaView<'a>>, ResolveError> {
        let child = match self.resolved()? {
            Cow::Borrowed(_) => match &self.fragment {
                Cow::Borrowed(fragment) => {
                    let fragment: &'a Value = *fragment;
                    fragment
                        .get(key)
                        .map(|value| SchemaView::new(value, self.resolver))
                }
                Cow::Owned(fragment) => fragment
                    .get(key)
                    .cloned()
                    .map(|value| SchemaView::owned(value, self.resolver)),
            },
            Cow::Owned(target) => target
                .get(key)
                .cloned()
                .map(|value| SchemaView::owned(value, self.resolver)),
        };
        Ok(child)
    }

    /// Keys of the dereferenced fragment. Empty for non-object fragments.
    pub fn keys(&self) -> Result<Vec<String>, ResolveError> {
        let target = self.resolved()?;
        Ok(target
            .as_object()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default())
    }

    /// Whether the dereferenced fragment has `key`.
    pub fn contains(&self, key: &str) -> Result<bool, ResolveError> {
        Ok(self.keys()?.iter().any(|k| k == key))
    }

    /// Key/view pairs of the dereferenced fragment, in key order.
    pub fn entries(&self) -> Result<Vec<(String, SchemaView<'a>)>, ResolveError> {
        let mut entries = Vec::new();
        for key in self.keys()? {
            if let Some(child) = self.get(&key)? {
                entries.push((key, child));
            }
        }
        Ok(entries)
    }

    /// The dereferenced fragment as a string, if it is one.
    pub fn as_str(&self) -> Result<Option<String>, ResolveError> {
        Ok(self.resolved()?.as_str().map(str::to_string))
    }

    /// Type names declared by the fragment's `type` keyword.
    ///
    /// Accepts both the single-string and the array form.
    pub fn type_names(&self) -> Result<Vec<String>, ResolveError> {
        let Some(declared) = self.get("type")? else {
            return Ok(Vec::new());
        };
        let target = declared.resolved()?;
        let names = match &*target {
            Value::String(name) => vec![name.clone()],
            Value::Array(items) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        };
        Ok(names)
    }

    /// Whether the fragment declares `name` among its types.
    pub fn declares_type(&self, name: &str) -> Result<bool, ResolveError> {
        Ok(self.type_names()?.iter().any(|t| t == name))
    }
}

//! # Model Factory
//!
//! [`ModelFactory`] turns a schema into a [`ModelType`]: a reusable
//! descriptor holding a private copy of the schema, its compiled validator,
//! the property table derived from it, and a cache of nested model types.
//!
//! ## Property Table
//!
//! At creation the schema's `properties` are walked once through a
//! [`SchemaView`], so `$ref`s are followed before anything is decided:
//!
//! - properties with a `default` feed [`Model::get`] and [`Model::keys`];
//! - properties declaring type `object` are materialized as nested models.
//!
//! ## Nested Types
//!
//! The first time an object-typed property receives an object, the nested
//! type is created with the same resolver, behavior and validator factory
//! and cached under the property name. Every later instance of the parent
//! type reuses it, so nested models of the same property share one
//! [`ModelType`] (compare with `==`, which is identity).
//!
//! The cache assumes a property name always denotes the same sub-schema.
//! A `$ref` whose target depends on where it is reached from would break
//! that assumption; the cache is never invalidated.
//!
//! ## Concurrency
//!
//! `ModelType` is `Send + Sync`. The nested cache sits behind a
//! `parking_lot::Mutex`, held while a missing nested type is compiled.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use sbnd_core::{rebase_fragment_refs, ResolveError, Resolver, SchemaView};
use sbnd_schema::{
    InstanceValidator, JsonSchemaFactory, SchemaRegistry, ValidationViolations, ValidatorFactory,
    Violation,
};
use serde_json::{Map, Value};

use crate::behavior::{Behavior, DefaultBehavior};
use crate::error::ModelError;
use crate::model::{Field, Model};

/// Name of a model type when neither the caller nor the schema names it.
pub const DEFAULT_MODEL_NAME: &str = "Model";

/// Schema keywords a nested schema inherits from its parent so that
/// document-relative references keep resolving.
const INHERITED_KEYWORDS: [&str; 3] = ["$schema", "definitions", "$defs"];

// ─── Factory ─────────────────────────────────────────────────────────

/// Configures and creates [`ModelType`]s.
#[derive(Debug, Clone)]
pub struct ModelFactory {
    behavior: Arc<dyn Behavior>,
    resolver: Option<Arc<dyn Resolver>>,
    validators: Arc<dyn ValidatorFactory>,
    name: Option<String>,
}

impl Default for ModelFactory {
    fn default() -> Self {
        Self {
            behavior: Arc::new(DefaultBehavior),
            resolver: None,
            validators: Arc::new(JsonSchemaFactory::new()),
            name: None,
        }
    }
}

impl ModelFactory {
    /// Factory with [`DefaultBehavior`], no resolver, and [`JsonSchemaFactory`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Customize every type created by this factory, nested types included.
    pub fn with_behavior(mut self, behavior: impl Behavior + 'static) -> Self {
        self.behavior = Arc::new(behavior);
        self
    }

    /// Follow `$ref`s through `resolver`.
    pub fn with_resolver(self, resolver: impl Resolver + 'static) -> Self {
        self.with_shared_resolver(Arc::new(resolver))
    }

    /// Follow `$ref`s through a resolver shared with other code.
    pub fn with_shared_resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Compile validators with `validators` instead of [`JsonSchemaFactory`].
    pub fn with_validator_factory(mut self, validators: impl ValidatorFactory + 'static) -> Self {
        self.validators = Arc::new(validators);
        self
    }

    /// Name the created type, overriding the schema's `name`.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The bound resolver, if any.
    pub fn resolver(&self) -> Option<&Arc<dyn Resolver>> {
        self.resolver.as_ref()
    }

    /// Create a model type for `schema`.
    ///
    /// The schema is copied, so later changes to the caller's value do not
    /// affect the returned type.
    ///
    /// # Errors
    ///
    /// - `ModelError::Schema` if the validator cannot be compiled.
    /// - `ModelError::InvalidOperation` if a `$ref` in `properties` cannot
    ///   be followed (including when no resolver is bound).
    pub fn create(&self, schema: &Value) -> Result<ModelType, ModelError> {
        let schema = schema.clone();
        let name = self
            .name
            .clone()
            .or_else(|| schema_name(&schema))
            .unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string());

        let validator = self.validators.compile(&schema, self.resolver.clone())?;
        let properties = PropertyTable::build(&schema, self.resolver.as_deref())?;

        tracing::debug!(
            model = %name,
            defaults = properties.defaults.len(),
            object_properties = properties.objects.len(),
            "created model type"
        );

        Ok(ModelType {
            inner: Arc::new(TypeInner {
                name,
                schema,
                validator,
                properties,
                factory: Self {
                    name: None,
                    ..self.clone()
                },
                nested: Mutex::new(HashMap::new()),
            }),
        })
    }

    /// Create a model type whose `#/...` references resolve within `schema`.
    ///
    /// Binds a [`SchemaRegistry`] rooted at `schema` unless a resolver is
    /// already set.
    pub fn create_self_contained(&self, schema: &Value) -> Result<ModelType, ModelError> {
        if self.resolver.is_some() {
            return self.create(schema);
        }
        self.clone()
            .with_resolver(SchemaRegistry::with_root(schema.clone()))
            .create(schema)
    }
}

/// The schema's own `name`, rendered as text.
fn schema_name(schema: &Value) -> Option<String> {
    match schema.get("name")? {
        Value::Null => None,
        Value::String(name) => Some(name.clone()),
        other => Some(other.to_string()),
    }
}

// ─── Property Table ──────────────────────────────────────────────────

/// What a model type needs to know about its declared properties.
#[derive(Debug, Clone, Default)]
struct PropertyTable {
    /// Property name → schema default.
    defaults: BTreeMap<String, Value>,
    /// Object-typed property name → sub-schema for its nested type.
    objects: BTreeMap<String, Value>,
}

impl PropertyTable {
    fn build(schema: &Value, resolver: Option<&dyn Resolver>) -> Result<Self, ResolveError> {
        let mut table = Self::default();
        let view = SchemaView::new(schema, resolver);
        let Some(properties) = view.get("properties")? else {
            return Ok(table);
        };

        for (key, property) in properties.entries()? {
            if let Some(default) = property.get("default")? {
                table.defaults.insert(key.clone(), default.into_value());
            }
            if property.declares_type("object")? {
                table.objects.insert(key, nested_schema(schema, &property)?);
            }
        }
        Ok(table)
    }
}

/// Sub-schema for the nested type of `property`.
///
/// A `$ref` property is replaced by its target. A target taken from another
/// document has its fragment-only `$ref`s rebased onto that document and
/// inherits only `$schema`; otherwise the parent's [`INHERITED_KEYWORDS`]
/// are copied in when the sub-schema lacks them.
fn nested_schema(parent: &Value, property: &SchemaView<'_>) -> Result<Value, ResolveError> {
    let (target, document) = property.resolved_with_document()?;
    let mut nested = target.into_owned();

    let inherited: &[&str] = match &document {
        Some(document) => {
            rebase_fragment_refs(&mut nested, document);
            &INHERITED_KEYWORDS[..1]
        }
        None => &INHERITED_KEYWORDS[..],
    };
    if let Value::Object(map) = &mut nested {
        for keyword in inherited {
            if let Some(value) = parent.get(*keyword) {
                map.entry(keyword.to_string())
                    .or_insert_with(|| value.clone());
            }
        }
    }
    Ok(nested)
}

// ─── Model Type ──────────────────────────────────────────────────────

struct TypeInner {
    name: String,
    schema: Value,
    validator: Box<dyn InstanceValidator>,
    properties: PropertyTable,
    /// Configuration propagated to nested types (never carries a name).
    factory: ModelFactory,
    /// Property name → nested type, shared by all instances.
    nested: Mutex<HashMap<String, ModelType>>,
}

/// A model type bound to one schema. Cheap to clone; clones are the same type.
#[derive(Clone)]
pub struct ModelType {
    inner: Arc<TypeInner>,
}

impl fmt::Debug for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelType")
            .field("name", &self.inner.name)
            .field("schema", &self.inner.schema)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.name)
    }
}

impl PartialEq for ModelType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for ModelType {}

impl ModelType {
    /// Shorthand for `ModelFactory::new().create(schema)`.
    pub fn from_schema(schema: &Value) -> Result<Self, ModelError> {
        ModelFactory::new().create(schema)
    }

    /// Display name of the type.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The type's private copy of its schema.
    pub fn schema(&self) -> &Value {
        &self.inner.schema
    }

    /// The resolver shared with every nested type.
    pub fn resolver(&self) -> Option<&Arc<dyn Resolver>> {
        self.inner.factory.resolver()
    }

    /// A `$ref`-following view of the schema.
    pub fn view(&self) -> SchemaView<'_> {
        SchemaView::new(&self.inner.schema, self.inner.factory.resolver.as_deref())
    }

    /// The behavior applied to instances of this type.
    pub fn behavior(&self) -> &dyn Behavior {
        self.inner.factory.behavior.as_ref()
    }

    /// Declared property defaults.
    pub fn defaults(&self) -> &BTreeMap<String, Value> {
        &self.inner.properties.defaults
    }

    /// Default for `key`, if the schema declares one.
    pub fn default_for(&self, key: &str) -> Option<&Value> {
        self.inner.properties.defaults.get(key)
    }

    /// Names of properties materialized as nested models.
    pub fn object_properties(&self) -> impl Iterator<Item = &str> {
        self.inner.properties.objects.keys().map(String::as_str)
    }

    /// Whether values of `key` are materialized as nested models.
    pub fn is_object_property(&self, key: &str) -> bool {
        self.inner.properties.objects.contains_key(key)
    }

    /// Number of nested types generated so far.
    pub fn cached_nested_types(&self) -> usize {
        self.inner.nested.lock().len()
    }

    /// The nested type for `key`, generating and caching it on first use.
    ///
    /// Returns `Ok(None)` for properties that are not object-typed.
    pub fn nested_type(&self, key: &str) -> Result<Option<ModelType>, ModelError> {
        let Some(schema) = self.inner.properties.objects.get(key) else {
            return Ok(None);
        };

        let mut cache = self.inner.nested.lock();
        if let Some(nested) = cache.get(key) {
            return Ok(Some(nested.clone()));
        }

        let nested = self.inner.factory.create(schema)?;
        tracing::debug!(
            model = %self.inner.name,
            property = key,
            nested = %nested.name(),
            "generated nested model type"
        );
        cache.insert(key.to_string(), nested.clone());
        Ok(Some(nested))
    }

    /// Check a complete candidate state against the schema and behavior.
    pub fn validate(&self, candidate: &Value) -> Result<(), ValidationViolations> {
        self.inner.validator.validate(candidate)?;
        match candidate.as_object() {
            Some(map) => self.behavior().check(map),
            None => Ok(()),
        }
    }

    /// Convert `value` into what is stored under `key`: a nested model for
    /// objects under object-typed properties, the value itself otherwise.
    pub(crate) fn materialize(&self, key: &str, value: Value) -> Result<Field, ModelError> {
        if value.is_object() {
            if let Some(nested) = self.nested_type(key)? {
                return Ok(Field::Model(nested.instantiate(value)?));
            }
        }
        Ok(Field::Value(value))
    }

    /// Construct a model from a JSON object.
    ///
    /// # Errors
    ///
    /// `ModelError::InvalidValue` if `data` is not an object or the
    /// assembled state fails validation.
    pub fn instantiate(&self, data: Value) -> Result<Model, ModelError> {
        match data {
            Value::Object(map) => self.builder().merge(map).build(),
            other => Err(ModelError::InvalidValue {
                model: self.inner.name.clone(),
                violations: Violation::at_root(format!("expected an object, found {other}"))
                    .into(),
            }),
        }
    }

    /// Construct a model from several maps merged left to right.
    pub fn instantiate_merged<I>(&self, sources: I) -> Result<Model, ModelError>
    where
        I: IntoIterator<Item = Map<String, Value>>,
    {
        sources
            .into_iter()
            .fold(self.builder(), ModelBuilder::merge)
            .build()
    }

    /// Start assembling the initial state of a model.
    pub fn builder(&self) -> ModelBuilder {
        ModelBuilder {
            model_type: self.clone(),
            entries: Map::new(),
        }
    }
}

// ─── Builder ─────────────────────────────────────────────────────────

/// Accumulates initial entries for a [`Model`]; later entries win.
#[derive(Debug)]
#[must_use = "a builder does nothing until `build` is called"]
pub struct ModelBuilder {
    model_type: ModelType,
    entries: Map<String, Value>,
}

impl ModelBuilder {
    /// Merge every entry of `source`, overriding earlier values.
    pub fn merge(mut self, source: Map<String, Value>) -> Self {
        self.entries.extend(source);
        self
    }

    /// Set a single entry, overriding earlier values.
    pub fn entry(mut self, key: impl Into<String>, value: Value) -> Self {
        self.entries.insert(key.into(), value);
        self
    }

    /// Materialize nested models and validate the assembled state.
    pub fn build(self) -> Result<Model, ModelError> {
        Model::new(self.model_type, self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn order_schema() -> Value {
        json!({
            "name": "Order",
            "type": "object",
            "properties": {
                "id": {"type": "string"},
                "quantity": {"type": "integer", "default": 1},
                "customer": {
                    "type": "object",
                    "properties": {"email": {"type": "string"}},
                    "required": ["email"]
                },
                "shipping": {"$ref": "#/definitions/address"}
            },
            "definitions": {
                "address": {
                    "type": "object",
                    "properties": {
                        "city": {"type": "string"},
                        "country": {"type": "string", "default": "NL"}
                    }
                }
            }
        })
    }

    #[test]
    fn test_name_priority() {
        let explicit = ModelFactory::new()
            .with_name("Purchase")
            .create_self_contained(&order_schema())
            .unwrap();
        assert_eq!(explicit.name(), "Purchase");

        let from_schema = ModelFactory::new()
            .create_self_contained(&order_schema())
            .unwrap();
        assert_eq!(from_schema.name(), "Order");

        let unnamed = ModelType::from_schema(&json!({"type": "object"})).unwrap();
        assert_eq!(unnamed.name(), DEFAULT_MODEL_NAME);

        let numeric = ModelType::from_schema(&json!({"name": 7})).unwrap();
        assert_eq!(numeric.name(), "7");
    }

    #[test]
    fn test_property_table() {
        let ty = ModelFactory::new()
            .create_self_contained(&order_schema())
            .unwrap();
        assert_eq!(ty.default_for("quantity"), Some(&json!(1)));
        assert_eq!(ty.default_for("id"), None);
        let objects: Vec<&str> = ty.object_properties().collect();
        assert_eq!(objects, vec!["customer", "shipping"]);
        assert!(!ty.is_object_property("id"));
    }

    #[test]
    fn test_schema_is_private_copy() {
        let mut schema = json!({"properties": {"a": {"type": "integer"}}});
        let ty = ModelType::from_schema(&schema).unwrap();
        schema["properties"]["a"]["type"] = json!("string");
        assert_eq!(ty.schema()["properties"]["a"]["type"], "integer");
        assert!(ty.instantiate(json!({"a": 1})).is_ok());
    }

    #[test]
    fn test_ref_without_resolver_is_invalid_operation() {
        let err = ModelType::from_schema(&order_schema()).unwrap_err();
        assert!(matches!(
            err,
            ModelError::InvalidOperation(crate::InvalidOperation::Resolve(
                ResolveError::NoResolver { .. }
            ))
        ));
    }

    #[test]
    fn test_nested_type_cached_per_property() {
        let ty = ModelFactory::new()
            .create_self_contained(&order_schema())
            .unwrap();
        assert_eq!(ty.cached_nested_types(), 0);

        let first = ty.nested_type("customer").unwrap().unwrap();
        let second = ty.nested_type("customer").unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(ty.cached_nested_types(), 1);
        assert!(ty.nested_type("id").unwrap().is_none());
    }

    #[test]
    fn test_nested_type_from_ref_inherits_definitions() {
        let ty = ModelFactory::new()
            .create_self_contained(&order_schema())
            .unwrap();
        let shipping = ty.nested_type("shipping").unwrap().unwrap();
        assert_eq!(shipping.default_for("country"), Some(&json!("NL")));
        assert!(shipping.schema().get("definitions").is_some());
        assert!(shipping.schema().get("$ref").is_none());
        assert!(Arc::ptr_eq(
            shipping.resolver().unwrap(),
            ty.resolver().unwrap()
        ));
    }

    #[test]
    fn test_invalid_schema_fails_creation() {
        let err = ModelType::from_schema(&json!({"type": "no-such-type"})).unwrap_err();
        assert!(matches!(err, ModelError::Schema(_)));
    }

    #[test]
    fn test_instantiate_requires_object() {
        let ty = ModelType::from_schema(&json!({})).unwrap();
        let err = ty.instantiate(json!([1, 2])).unwrap_err();
        assert!(matches!(err, ModelError::InvalidValue { .. }));
    }

    #[test]
    fn test_builder_merges_left_to_right() {
        let ty = ModelType::from_schema(&json!({"type": "object"})).unwrap();
        let mut first = Map::new();
        first.insert("a".to_string(), json!(1));
        first.insert("b".to_string(), json!(1));
        let mut second = Map::new();
        second.insert("b".to_string(), json!(2));

        let model = ty
            .builder()
            .merge(first.clone())
            .merge(second.clone())
            .entry("c", json!(3))
            .build()
            .unwrap();
        assert_eq!(model.to_value(), json!({"a": 1, "b": 2, "c": 3}));

        let merged = ty.instantiate_merged([first, second]).unwrap();
        assert_eq!(merged.to_value(), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_clones_are_same_type() {
        let ty = ModelType::from_schema(&json!({})).unwrap();
        let other = ModelType::from_schema(&json!({})).unwrap();
        assert_eq!(ty, ty.clone());
        assert_ne!(ty, other);
        assert_eq!(ty.to_string(), DEFAULT_MODEL_NAME);
    }
}

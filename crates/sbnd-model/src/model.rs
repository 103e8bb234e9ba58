//! # Validating Model
//!
//! A [`Model`] is a key/value mapping bound to a [`ModelType`]. Every
//! mutation follows the same discipline:
//!
//! 1. materialize the incoming value (objects under object-typed
//!    properties become nested models);
//! 2. build the complete candidate state;
//! 3. validate the candidate as a whole;
//! 4. commit, or return an error and leave the model untouched.
//!
//! Bulk removals (`clear`, `pop`, `pop_last`) have no single-candidate
//! reading and are always refused.

use std::collections::{BTreeMap, BTreeSet};

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::behavior::Mutation;
use crate::error::{InvalidOperation, ModelError};
use crate::factory::ModelType;

/// A stored value: plain JSON or a nested model.
#[derive(Debug)]
pub enum Field {
    /// Plain JSON value.
    Value(Value),
    /// Nested model materialized for an object-typed property.
    Model(Model),
}

impl Field {
    /// Plain JSON copy of the field.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Model(model) => model.to_value(),
        }
    }

    fn duplicate(&self) -> Field {
        match self {
            Self::Value(value) => Self::Value(value.clone()),
            Self::Model(model) => Self::Model(model.duplicate()),
        }
    }

    /// The nested model, if this field holds one.
    pub fn as_model(&self) -> Option<&Model> {
        match self {
            Self::Model(model) => Some(model),
            Self::Value(_) => None,
        }
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(value) => value.serialize(serializer),
            Self::Model(model) => model.serialize(serializer),
        }
    }
}

/// A mapping that only ever holds states accepted by its schema.
#[derive(Debug)]
pub struct Model {
    model_type: ModelType,
    state: BTreeMap<String, Field>,
    /// Plain copy of the state at construction.
    original: Value,
    /// Key → last assigned value, `None` once deleted.
    changes: BTreeMap<String, Option<Value>>,
}

impl Model {
    pub(crate) fn new(model_type: ModelType, entries: Map<String, Value>) -> Result<Self, ModelError> {
        let mut state = BTreeMap::new();
        for (key, value) in entries {
            let field = model_type.materialize(&key, value)?;
            state.insert(key, field);
        }

        let original = Value::Object(plain_map(&state));
        model_type
            .validate(&original)
            .map_err(|violations| ModelError::InvalidValue {
                model: model_type.name().to_string(),
                violations,
            })?;

        Ok(Self {
            model_type,
            state,
            original,
            changes: BTreeMap::new(),
        })
    }

    /// The type this model was instantiated from.
    pub fn model_type(&self) -> &ModelType {
        &self.model_type
    }

    /// Name of the model type.
    pub fn name(&self) -> &str {
        self.model_type.name()
    }

    /// Value stored under `key`, else its schema default.
    ///
    /// Defaults are computed on read and never stored.
    ///
    /// # Errors
    ///
    /// `ModelError::MissingKey` if the key is absent and has no default.
    pub fn get(&self, key: &str) -> Result<Value, ModelError> {
        if let Some(field) = self.state.get(key) {
            return Ok(field.to_value());
        }
        self.model_type
            .default_for(key)
            .cloned()
            .ok_or_else(|| ModelError::MissingKey(key.to_string()))
    }

    /// The stored field under `key`, ignoring defaults.
    pub fn field(&self, key: &str) -> Option<&Field> {
        self.state.get(key)
    }

    /// The nested model stored under `key`.
    pub fn nested(&self, key: &str) -> Option<&Model> {
        self.state.get(key).and_then(Field::as_model)
    }

    /// Mutate the nested model under `key` through `edit`, then validate
    /// this model's resulting state.
    ///
    /// Each mutation inside `edit` is checked against the nested schema as
    /// usual. The parent's schema and behavior are checked once `edit`
    /// returns, and the change is recorded as an assignment of `key`.
    ///
    /// # Errors
    ///
    /// - `ModelError::MissingKey` if no nested model is stored under `key`.
    /// - Whatever `edit` returns.
    /// - `InvalidOperation::Set` if the parent rejects the edited state.
    ///
    /// On any error the nested model is restored to its state before `edit`.
    pub fn with_nested<T, F>(&mut self, key: &str, edit: F) -> Result<T, ModelError>
    where
        F: FnOnce(&mut Model) -> Result<T, ModelError>,
    {
        let Some(Field::Model(nested)) = self.state.get_mut(key) else {
            return Err(ModelError::MissingKey(key.to_string()));
        };
        let before = nested.duplicate();
        let output = match edit(&mut *nested) {
            Ok(output) => output,
            Err(err) => {
                *nested = before;
                return Err(err);
            }
        };
        let value = nested.to_value();
        if value == before.to_value() {
            return Ok(output);
        }

        if let Err(violations) = self.model_type.validate(&self.to_value()) {
            if let Some(Field::Model(nested)) = self.state.get_mut(key) {
                *nested = before;
            }
            return Err(self.rejected(InvalidOperation::Set {
                key: key.to_string(),
                value,
                reason: violations.summary(),
            }));
        }

        self.model_type.behavior().on_commit(
            self.model_type.name(),
            &Mutation::Set { key, value: &value },
        );
        self.changes.insert(key.to_string(), Some(value));
        Ok(output)
    }

    /// Assign `value` to `key` if the resulting state is valid.
    ///
    /// # Errors
    ///
    /// `InvalidOperation::Set` if the value, or the state it produces, is
    /// rejected. The model is unchanged on error.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Result<(), ModelError> {
        let key = key.into();
        let field = match self.model_type.materialize(&key, value.clone()) {
            Ok(field) => field,
            Err(ModelError::InvalidValue { violations, .. }) => {
                return Err(self.rejected(InvalidOperation::Set {
                    key,
                    value,
                    reason: violations.summary(),
                }));
            }
            Err(other) => return Err(other),
        };

        let mut candidate = self.to_map();
        candidate.insert(key.clone(), field.to_value());
        if let Err(violations) = self.model_type.validate(&Value::Object(candidate)) {
            return Err(self.rejected(InvalidOperation::Set {
                key,
                value,
                reason: violations.summary(),
            }));
        }

        self.state.insert(key.clone(), field);
        self.model_type.behavior().on_commit(
            self.model_type.name(),
            &Mutation::Set {
                key: &key,
                value: &value,
            },
        );
        self.changes.insert(key, Some(value));
        Ok(())
    }

    /// Remove `key` if the resulting state is valid.
    ///
    /// # Errors
    ///
    /// `ModelError::MissingKey` if nothing is stored under `key`;
    /// `InvalidOperation::Delete` if removal is rejected.
    pub fn delete(&mut self, key: &str) -> Result<(), ModelError> {
        if !self.state.contains_key(key) {
            return Err(ModelError::MissingKey(key.to_string()));
        }

        let mut candidate = self.to_map();
        candidate.remove(key);
        if let Err(violations) = self.model_type.validate(&Value::Object(candidate)) {
            return Err(self.rejected(InvalidOperation::Delete {
                key: key.to_string(),
                reason: violations.summary(),
            }));
        }

        self.state.remove(key);
        self.model_type
            .behavior()
            .on_commit(self.model_type.name(), &Mutation::Delete { key });
        self.changes.insert(key.to_string(), None);
        Ok(())
    }

    /// Assign every entry at once, validating the merged state a single time.
    ///
    /// Later entries for the same key win.
    ///
    /// # Errors
    ///
    /// `InvalidOperation::Update` if any value or the merged state is
    /// rejected. No entry is applied on error.
    pub fn update<I, K>(&mut self, entries: I) -> Result<(), ModelError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut candidate = self.to_map();
        let mut staged: Vec<(String, Field, Value)> = Vec::new();

        for (key, value) in entries {
            let key = key.into();
            let field = match self.model_type.materialize(&key, value.clone()) {
                Ok(field) => field,
                Err(ModelError::InvalidValue { violations, .. }) => {
                    return Err(self.rejected(InvalidOperation::Update {
                        reason: format!("'{key}': {}", violations.summary()),
                    }));
                }
                Err(other) => return Err(other),
            };
            candidate.insert(key.clone(), field.to_value());
            staged.push((key, field, value));
        }

        if let Err(violations) = self.model_type.validate(&Value::Object(candidate)) {
            return Err(self.rejected(InvalidOperation::Update {
                reason: violations.summary(),
            }));
        }

        let keys: Vec<String> = staged.iter().map(|(key, _, _)| key.clone()).collect();
        for (key, field, value) in staged {
            self.state.insert(key.clone(), field);
            self.changes.insert(key, Some(value));
        }
        self.model_type
            .behavior()
            .on_commit(self.model_type.name(), &Mutation::Update { keys: &keys });
        Ok(())
    }

    /// Always refused.
    pub fn clear(&mut self) -> Result<(), ModelError> {
        Err(self.rejected(InvalidOperation::Unsupported { operation: "clear" }))
    }

    /// Always refused, whatever the key.
    pub fn pop(&mut self, _key: &str) -> Result<Value, ModelError> {
        Err(self.rejected(InvalidOperation::Unsupported { operation: "pop" }))
    }

    /// Always refused.
    pub fn pop_last(&mut self) -> Result<(String, Value), ModelError> {
        Err(self.rejected(InvalidOperation::Unsupported {
            operation: "pop_last",
        }))
    }

    /// Stored keys plus defaulted properties, sorted.
    pub fn keys(&self) -> Vec<String> {
        let keys: BTreeSet<&String> = self
            .state
            .keys()
            .chain(self.model_type.defaults().keys())
            .collect();
        keys.into_iter().cloned().collect()
    }

    /// Whether `key` is stored or defaulted.
    pub fn contains_key(&self, key: &str) -> bool {
        self.state.contains_key(key) || self.model_type.default_for(key).is_some()
    }

    /// Number of keys, defaults included.
    pub fn len(&self) -> usize {
        self.keys().len()
    }

    /// Whether there are no keys, defaults included.
    pub fn is_empty(&self) -> bool {
        self.state.is_empty() && self.model_type.defaults().is_empty()
    }

    /// Plain copies of every key/value pair, defaults included.
    pub fn items(&self) -> Vec<(String, Value)> {
        self.keys()
            .into_iter()
            .filter_map(|key| self.get(&key).ok().map(|value| (key, value)))
            .collect()
    }

    /// Plain, non-validating copy of the stored state.
    pub fn to_map(&self) -> Map<String, Value> {
        plain_map(&self.state)
    }

    /// Plain, non-validating copy of the stored state as a JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(self.to_map())
    }

    /// State at construction.
    pub fn original(&self) -> &Value {
        &self.original
    }

    /// Keys mutated since construction with their last assigned value
    /// (`None` when the last mutation was a delete).
    pub fn changes(&self) -> &BTreeMap<String, Option<Value>> {
        &self.changes
    }

    /// JSON Patch from the original state to the current state.
    pub fn patch_document(&self) -> json_patch::Patch {
        json_patch::diff(&self.original, &self.to_value())
    }

    /// [`Model::patch_document`] serialized as a JSON string.
    pub fn patch(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string(&self.patch_document())?)
    }

    /// Deep copy used to roll back a nested edit. Not exposed as `Clone`:
    /// copies handed to callers are plain JSON.
    fn duplicate(&self) -> Model {
        Model {
            model_type: self.model_type.clone(),
            state: self
                .state
                .iter()
                .map(|(key, field)| (key.clone(), field.duplicate()))
                .collect(),
            original: self.original.clone(),
            changes: self.changes.clone(),
        }
    }

    fn rejected(&self, operation: InvalidOperation) -> ModelError {
        tracing::debug!(model = %self.model_type.name(), error = %operation, "rejected mutation");
        operation.into()
    }
}

impl Serialize for Model {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.state.len()))?;
        for (key, field) in &self.state {
            map.serialize_entry(key, field)?;
        }
        map.end()
    }
}

impl From<&Model> for Value {
    fn from(model: &Model) -> Self {
        model.to_value()
    }
}

impl From<Model> for Value {
    fn from(model: Model) -> Self {
        model.to_value()
    }
}

fn plain_map(state: &BTreeMap<String, Field>) -> Map<String, Value> {
    state
        .iter()
        .map(|(key, field)| (key.clone(), field.to_value()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn person() -> ModelType {
        ModelType::from_schema(&json!({
            "properties": {
                "name": {"type": "string"},
                "age": {"type": "integer", "default": 0}
            },
            "required": ["name"]
        }))
        .unwrap()
    }

    #[test]
    fn test_construct_and_read_default() {
        let model = person().instantiate(json!({"name": "Ann"})).unwrap();
        assert_eq!(model.get("name").unwrap(), json!("Ann"));
        assert_eq!(model.get("age").unwrap(), json!(0));
        assert!(model.field("age").is_none());
        assert_eq!(model.to_value(), json!({"name": "Ann"}));
    }

    #[test]
    fn test_construct_invalid_fails() {
        let err = person().instantiate(json!({"age": 3})).unwrap_err();
        match err {
            ModelError::InvalidValue { model, violations } => {
                assert_eq!(model, "Model");
                assert!(!violations.is_empty());
            }
            other => panic!("Expected InvalidValue, got: {other}"),
        }
    }

    #[test]
    fn test_missing_key() {
        let model = person().instantiate(json!({"name": "Ann"})).unwrap();
        assert!(matches!(
            model.get("email"),
            Err(ModelError::MissingKey(key)) if key == "email"
        ));
    }

    #[test]
    fn test_set_valid_records_change() {
        let mut model = person().instantiate(json!({"name": "Ann"})).unwrap();
        model.set("age", json!(31)).unwrap();
        assert_eq!(model.get("age").unwrap(), json!(31));
        assert_eq!(model.changes().get("age"), Some(&Some(json!(31))));
    }

    #[test]
    fn test_set_invalid_is_atomic() {
        let mut model = person().instantiate(json!({"name": "Ann"})).unwrap();
        let before = model.to_value();
        let err = model.set("name", json!(42)).unwrap_err();
        match err {
            ModelError::InvalidOperation(InvalidOperation::Set { key, value, reason }) => {
                assert_eq!(key, "name");
                assert_eq!(value, json!(42));
                assert!(!reason.is_empty());
            }
            other => panic!("Expected Set rejection, got: {other}"),
        }
        assert_eq!(model.to_value(), before);
        assert!(model.changes().is_empty());
    }

    #[test]
    fn test_delete_required_rejected() {
        let mut model = person().instantiate(json!({"name": "Ann"})).unwrap();
        let err = model.delete("name").unwrap_err();
        assert!(matches!(
            err,
            ModelError::InvalidOperation(InvalidOperation::Delete { .. })
        ));
        assert_eq!(model.get("name").unwrap(), json!("Ann"));
    }

    #[test]
    fn test_delete_optional_records_none() {
        let mut model = person()
            .instantiate(json!({"name": "Ann", "age": 4}))
            .unwrap();
        model.delete("age").unwrap();
        assert_eq!(model.get("age").unwrap(), json!(0));
        assert_eq!(model.changes().get("age"), Some(&None));
    }

    #[test]
    fn test_delete_absent_key() {
        let mut model = person().instantiate(json!({"name": "Ann"})).unwrap();
        assert!(matches!(model.delete("age"), Err(ModelError::MissingKey(_))));
    }

    #[test]
    fn test_update_validates_once_and_commits_all() {
        let mut model = person().instantiate(json!({"name": "Ann"})).unwrap();
        model
            .update([("name", json!("Bea")), ("age", json!(7))])
            .unwrap();
        assert_eq!(model.to_value(), json!({"name": "Bea", "age": 7}));
        assert_eq!(model.changes().len(), 2);
    }

    #[test]
    fn test_update_rejected_applies_nothing() {
        let mut model = person().instantiate(json!({"name": "Ann"})).unwrap();
        let err = model
            .update([("age", json!(7)), ("name", json!(false))])
            .unwrap_err();
        assert!(matches!(
            err,
            ModelError::InvalidOperation(InvalidOperation::Update { .. })
        ));
        assert_eq!(model.to_value(), json!({"name": "Ann"}));
    }

    #[test]
    fn test_denylist() {
        let mut model = person().instantiate(json!({"name": "Ann"})).unwrap();
        for err in [
            model.clear().unwrap_err(),
            model.pop("name").unwrap_err(),
            model.pop_last().unwrap_err(),
        ] {
            assert!(matches!(
                err,
                ModelError::InvalidOperation(InvalidOperation::Unsupported { .. })
            ));
        }
        assert_eq!(model.to_value(), json!({"name": "Ann"}));
    }

    #[test]
    fn test_keys_include_defaults() {
        let model = person().instantiate(json!({"name": "Ann"})).unwrap();
        assert_eq!(model.keys(), vec!["age".to_string(), "name".to_string()]);
        assert!(model.contains_key("age"));
        assert!(!model.contains_key("email"));
        assert_eq!(model.len(), 2);
        assert_eq!(
            model.items(),
            vec![
                ("age".to_string(), json!(0)),
                ("name".to_string(), json!("Ann"))
            ]
        );
    }

    #[test]
    fn test_empty_model_with_defaults_is_not_empty() {
        let ty = ModelType::from_schema(&json!({
            "properties": {"flag": {"type": "boolean", "default": true}}
        }))
        .unwrap();
        let model = ty.instantiate(json!({})).unwrap();
        assert!(!model.is_empty());
        assert_eq!(model.keys(), vec!["flag".to_string()]);
        assert_eq!(model.to_value(), json!({}));
    }

    #[test]
    fn test_patch_tracks_delta() {
        let ty = ModelType::from_schema(&json!({"type": "object"})).unwrap();
        let mut model = ty.instantiate(json!({"a": 1})).unwrap();
        assert_eq!(model.patch().unwrap(), "[]");

        model.set("b", json!(2)).unwrap();
        let patch: Value = serde_json::from_str(&model.patch().unwrap()).unwrap();
        assert_eq!(patch, json!([{"op": "add", "path": "/b", "value": 2}]));

        model.delete("a").unwrap();
        let ops = serde_json::to_value(model.patch_document()).unwrap();
        let ops = ops.as_array().unwrap();
        assert_eq!(ops.len(), 2);
        assert!(ops.contains(&json!({"op": "remove", "path": "/a"})));
        assert!(ops.contains(&json!({"op": "add", "path": "/b", "value": 2})));
        assert_eq!(model.original(), &json!({"a": 1}));
    }

    #[test]
    fn test_serialize_matches_to_value() {
        let model = person()
            .instantiate(json!({"name": "Ann", "age": 2}))
            .unwrap();
        assert_eq!(serde_json::to_value(&model).unwrap(), model.to_value());
        assert_eq!(Value::from(&model), json!({"name": "Ann", "age": 2}));
    }
}

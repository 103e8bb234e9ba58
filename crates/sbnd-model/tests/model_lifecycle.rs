//! Integration tests: construction, defaults, validated mutation, and
//! change tracking on flat models.

use sbnd_model::{InvalidOperation, ModelError, ModelFactory, ModelType};
use serde_json::{json, Value};

fn person_type() -> ModelType {
    ModelType::from_schema(&json!({
        "properties": {
            "name": {"type": "string"},
            "age": {"type": "integer", "default": 0}
        },
        "required": ["name"]
    }))
    .expect("person schema compiles")
}

fn patch_ops(model: &sbnd_model::Model) -> Vec<Value> {
    let patch: Value = serde_json::from_str(&model.patch().unwrap()).unwrap();
    patch.as_array().cloned().unwrap_or_default()
}

#[test]
fn test_person_end_to_end() {
    let mut ann = person_type().instantiate(json!({"name": "Ann"})).unwrap();
    assert_eq!(ann.get("age").unwrap(), json!(0));

    let err = ann.set("name", json!(42)).unwrap_err();
    assert!(matches!(
        err,
        ModelError::InvalidOperation(InvalidOperation::Set { .. })
    ));
    assert_eq!(ann.get("name").unwrap(), json!("Ann"));

    let err = ann.delete("name").unwrap_err();
    assert!(matches!(
        err,
        ModelError::InvalidOperation(InvalidOperation::Delete { .. })
    ));
    assert_eq!(ann.get("name").unwrap(), json!("Ann"));
}

#[test]
fn test_default_read_does_not_store() {
    let ann = person_type().instantiate(json!({"name": "Ann"})).unwrap();
    for _ in 0..3 {
        assert_eq!(ann.get("age").unwrap(), json!(0));
    }
    assert_eq!(ann.to_value(), json!({"name": "Ann"}));
    assert!(ann.patch_document().0.is_empty());
}

#[test]
fn test_patch_accumulates_relative_to_original() {
    let ty = ModelType::from_schema(&json!({"type": "object"})).unwrap();
    let mut model = ty.instantiate(json!({"a": 1})).unwrap();

    model.set("b", json!(2)).unwrap();
    assert_eq!(
        patch_ops(&model),
        vec![json!({"op": "add", "path": "/b", "value": 2})]
    );

    model.delete("a").unwrap();
    let ops = patch_ops(&model);
    assert_eq!(ops.len(), 2);
    assert!(ops.contains(&json!({"op": "remove", "path": "/a"})));
    assert!(ops.contains(&json!({"op": "add", "path": "/b", "value": 2})));
}

#[test]
fn test_patch_reports_replace() {
    let mut ann = person_type()
        .instantiate(json!({"name": "Ann", "age": 30}))
        .unwrap();
    ann.set("age", json!(31)).unwrap();
    assert_eq!(
        patch_ops(&ann),
        vec![json!({"op": "replace", "path": "/age", "value": 31})]
    );
}

#[test]
fn test_patch_empty_after_round_trip() {
    let mut ann = person_type()
        .instantiate(json!({"name": "Ann", "age": 30}))
        .unwrap();
    ann.set("age", json!(31)).unwrap();
    ann.set("age", json!(30)).unwrap();
    assert!(patch_ops(&ann).is_empty());
    assert_eq!(ann.changes().get("age"), Some(&Some(json!(30))));
}

#[test]
fn test_update_validates_merged_state_once() {
    // "card" requires "billing": neither key can be added on its own.
    let ty = ModelType::from_schema(&json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "properties": {
            "card": {"type": "string"},
            "billing": {"type": "string"}
        },
        "dependentRequired": {"card": ["billing"]}
    }))
    .unwrap();
    let mut model = ty.instantiate(json!({})).unwrap();

    assert!(model.set("card", json!("4111")).is_err());
    assert_eq!(model.to_value(), json!({}));

    model
        .update([("card", json!("4111")), ("billing", json!("Main St 1"))])
        .unwrap();
    assert_eq!(model.to_value(), json!({"card": "4111", "billing": "Main St 1"}));
}

#[test]
fn test_update_accepts_json_map() {
    let mut ann = person_type().instantiate(json!({"name": "Ann"})).unwrap();
    let Value::Object(other) = json!({"age": 5, "name": "Ana"}) else {
        unreachable!()
    };
    ann.update(other).unwrap();
    assert_eq!(ann.to_value(), json!({"name": "Ana", "age": 5}));
}

#[test]
fn test_denylist_regardless_of_schema_and_state() {
    let schemas = [
        json!({}),
        json!({"type": "object", "properties": {"x": {"type": "integer"}}}),
        json!({"properties": {"d": {"default": 1}}}),
    ];
    for schema in schemas {
        let ty = ModelType::from_schema(&schema).unwrap();
        for data in [json!({}), json!({"x": 1})] {
            let mut model = ty.instantiate(data).unwrap();
            let before = model.to_value();
            assert!(matches!(
                model.clear(),
                Err(ModelError::InvalidOperation(InvalidOperation::Unsupported { operation: "clear" }))
            ));
            assert!(matches!(
                model.pop("x"),
                Err(ModelError::InvalidOperation(InvalidOperation::Unsupported { operation: "pop" }))
            ));
            assert!(matches!(
                model.pop_last(),
                Err(ModelError::InvalidOperation(InvalidOperation::Unsupported {
                    operation: "pop_last"
                }))
            ));
            assert_eq!(model.to_value(), before);
        }
    }
}

#[test]
fn test_copy_is_plain_json() {
    let mut ann = person_type().instantiate(json!({"name": "Ann"})).unwrap();
    let mut copy = ann.to_map();
    copy.insert("name".to_string(), json!(42));
    assert_eq!(ann.get("name").unwrap(), json!("Ann"));

    ann.set("age", json!(1)).unwrap();
    assert!(!copy.contains_key("age"));
}

#[test]
fn test_named_type_in_errors() {
    let ty = ModelFactory::new()
        .with_name("Person")
        .create(&json!({"required": ["name"]}))
        .unwrap();
    let err = ty.instantiate(json!({})).unwrap_err();
    assert!(err.to_string().starts_with("invalid value for model 'Person'"));
}

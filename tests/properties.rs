use json_vgen::{Schema, Validator};
use proptest::prelude::*;
use serde_json::{json, Value};

fn validator() -> Validator {
    let schema: Schema = serde_json::from_value(json!({"types": [
        {"name": "Item", "fields": [
            {"name": "Type", "json": "type", "type": "string"},
            {"name": "Status", "json": "status", "type": "string", "directives": [{"enum": ["True", "False"]}]},
        ]},
        {"name": "Entry", "fields": [
            {"name": "Value", "json": "value", "type": {"optional": "string"}, "directives": [{"immutable": {}}]},
        ]},
        {"name": "Spec", "fields": [
            {"name": "Items", "json": "items", "type": {"list": "Item"}, "listMapKeys": ["type"], "directives": [
                {"subfield": {"type": "A"}, "payload": [{"unionMember": {}}, {"subfield": "status", "payload": {"immutable": {}}}]},
                {"subfield": {"type": "B"}, "payload": {"unionMember": {}}},
                {"subfield": {"status": "True"}, "payload": {"validateFalse": "status True"}},
            ]},
            {"name": "Entries", "json": "entries", "type": {"list": "Entry"}},
        ]},
    ]})).unwrap();
    Validator::compile(&schema).unwrap()
}

fn items() -> impl Strategy<Value = Value> {
    let item = ("[ABC]", prop_oneof![Just("True"), Just("False"), Just("Unknown")])
        .prop_map(|(t, s)| json!({"type": t, "status": s}));
    let entry = prop_oneof![Just(json!({})), "[a-c]{0,2}".prop_map(|v| json!({"value": v}))];
    (prop::collection::vec(item, 0..6), prop::collection::vec(entry, 0..4))
        .prop_map(|(items, entries)| json!({"items": items, "entries": entries}))
}

proptest! {
    /// Same input, same errors in the same order.
    #[test]
    fn validation_is_deterministic(new in items(), old in items()) {
        let v = validator();
        let a = v.validate_update("Spec", &new, &old).unwrap();
        let b = v.validate_update("Spec", &new, &old).unwrap();
        prop_assert_eq!(a, b);
    }

    /// Unions look at the new record only.
    #[test]
    fn union_errors_ignore_old(new in items(), old in items()) {
        let v = validator();
        let created = v.validate("Spec", &new).unwrap();
        let updated = v.validate_update("Spec", &new, &old).unwrap();
        prop_assert_eq!(created.details_from("unionMember"), updated.details_from("unionMember"));
    }

    /// Validating an unchanged record never reports immutability errors.
    #[test]
    fn unchanged_update_is_not_forbidden(doc in items()) {
        let v = validator();
        let errs = v.validate_update("Spec", &doc, &doc).unwrap();
        prop_assert!(errs.iter().all(|e| e.detail != "field is immutable"));
    }
}

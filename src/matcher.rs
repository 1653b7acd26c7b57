//! Selector predicates over JSON list elements.
use serde_json::Value;

use crate::directive::Selector;
use crate::error::CompileErrorKind;
use crate::lower::RecordInfo;
use crate::validate::canonical_selector_path;

#[derive(Debug, Clone)]
struct Clause {
    wire: String,
    expected: String,
    nilable: bool,
}

/// Compiled form of a selector against one element type. Clauses are kept in
/// key order, so two compilations of the same selector are interchangeable.
#[derive(Debug, Clone)]
pub struct ElementMatcher {
    clauses: Vec<Clause>,
    canonical: String,
}

impl ElementMatcher {
    pub fn compile(element: &RecordInfo, selector: &Selector) -> Result<Self, CompileErrorKind> {
        let mut clauses = Vec::with_capacity(selector.len());
        for (key, expected) in selector {
            let Some(field) = element.field(key) else {
                return Err(CompileErrorKind::SelectorUnknownField {
                    element: element.name.clone(),
                    key: key.clone(),
                });
            };
            let ty = &field.accessor.ty;
            if !ty.is_string_kind() {
                return Err(CompileErrorKind::SelectorNotString {
                    element: element.name.clone(),
                    key: key.clone(),
                    ty: ty.to_string(),
                });
            }
            clauses.push(Clause { wire: key.clone(), expected: expected.clone(), nilable: ty.is_nilable() });
        }
        Ok(Self { clauses, canonical: canonical_selector_path(selector) })
    }

    /// `k="v",...`, the grouped path segment for matches.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn matches(&self, element: &Value) -> bool {
        let Value::Object(map) = element else { return false };
        self.clauses.iter().all(|c| match map.get(&c.wire) {
            // An absent string compares as "", an absent optional never matches.
            None | Some(Value::Null) => !c.nilable && c.expected.is_empty(),
            Some(Value::String(s)) => *s == c.expected,
            Some(_) => false,
        })
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Schema;
    use crate::lower::lower_schema;
    use proptest::prelude::*;
    use serde_json::json;

    fn item() -> RecordInfo {
        let schema: Schema = serde_json::from_value(json!({"types": [
            {"name": "Item", "fields": [
                {"name": "Type", "json": "type", "type": "string"},
                {"name": "Status", "json": "status", "type": {"optional": "string"}},
                {"name": "Count", "json": "count", "type": "integer"},
            ]},
        ]})).unwrap();
        lower_schema(&schema).unwrap().get("Item").unwrap().clone()
    }

    fn sel(pairs: &[(&str, &str)]) -> Selector {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn matches_every_clause() {
        let m = ElementMatcher::compile(&item(), &sel(&[("type", "A"), ("status", "True")])).unwrap();
        assert_eq!(m.canonical(), r#"status="True",type="A""#);
        assert!(m.matches(&json!({"type": "A", "status": "True"})));
        assert!(!m.matches(&json!({"type": "A", "status": "False"})));
        assert!(!m.matches(&json!({"type": "A"})));
        assert!(!m.matches(&Value::Null));
    }

    #[test]
    fn absent_string_compares_as_empty() {
        let m = ElementMatcher::compile(&item(), &sel(&[("type", "")])).unwrap();
        assert!(m.matches(&json!({})));
        let m = ElementMatcher::compile(&item(), &sel(&[("status", "")])).unwrap();
        assert!(!m.matches(&json!({})));
        assert!(m.matches(&json!({"status": ""})));
    }

    #[test]
    fn rejects_unknown_and_non_string_keys() {
        assert!(matches!(
            ElementMatcher::compile(&item(), &sel(&[("nope", "x")])),
            Err(CompileErrorKind::SelectorUnknownField { .. })
        ));
        assert!(matches!(
            ElementMatcher::compile(&item(), &sel(&[("count", "1")])),
            Err(CompileErrorKind::SelectorNotString { .. })
        ));
    }

    fn field_value() -> impl Strategy<Value = Option<Value>> {
        prop_oneof![
            Just(None),
            Just(Some(Value::Null)),
            prop_oneof![Just(""), Just("A"), Just("B")].prop_map(|s| Some(json!(s))),
        ]
    }

    fn element() -> impl Strategy<Value = Value> {
        (field_value(), field_value()).prop_map(|(ty, status)| {
            let mut map = serde_json::Map::new();
            if let Some(v) = ty {
                map.insert("type".into(), v);
            }
            if let Some(v) = status {
                map.insert("status".into(), v);
            }
            Value::Object(map)
        })
    }

    fn selector_pairs() -> impl Strategy<Value = Vec<(String, String)>> {
        let value = || prop_oneof![Just(""), Just("A"), Just("B")];
        (proptest::option::of(value()), proptest::option::of(value()))
            .prop_filter("selector needs a key", |(t, s)| t.is_some() || s.is_some())
            .prop_map(|(t, s)| {
                let mut pairs = Vec::new();
                if let Some(t) = t {
                    pairs.push(("type".to_string(), t.to_string()));
                }
                if let Some(s) = s {
                    pairs.push(("status".to_string(), s.to_string()));
                }
                pairs
            })
    }

    proptest! {
        #[test]
        fn recompiling_a_selector_gives_an_equivalent_matcher(
            pairs in selector_pairs(),
            elements in proptest::collection::vec(element(), 0..8),
        ) {
            let forward: Selector = pairs.iter().cloned().collect();
            let backward: Selector = pairs.iter().rev().cloned().collect();
            let a = ElementMatcher::compile(&item(), &forward).unwrap();
            let b = ElementMatcher::compile(&item(), &backward).unwrap();
            prop_assert_eq!(a.canonical(), b.canonical());
            for e in &elements {
                prop_assert_eq!(a.matches(e), b.matches(e));
            }
        }
    }
}

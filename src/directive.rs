//! Directives as they appear in the schema document.
//!
//! A directive is a JSON object with exactly one tag key, plus the optional
//! `flags` and (for `subfield`) `payload` keys:
//!
//! ```json
//! {"subfield": {"listElems": {"type": "Approved"}}, "payload": [{"required": {}}]}
//! {"subfield": "name", "payload": [{"maxLength": 63}]}
//! {"unionMember": {"union": "source", "memberName": "Git"}}
//! {"validateFalse": "type Struct", "flags": {"shortCircuit": true}}
//! ```
use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::DirectiveError;
use crate::validate::{Flags, Pairing, PathMode};

/// Wire name -> expected string value. Sorted, so iteration is canonical.
pub type Selector = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct Directive {
    pub kind: DirectiveKind,
    pub flags: Flags,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveKind {
    Subfield { target: SubfieldTarget, payload: Vec<Directive> },
    UnionMember { union: String, member_name: Option<String> },
    UnionDiscriminator { union: String },
    Primitive(Primitive),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubfieldTarget {
    /// A direct field of the record, by wire name.
    Field(String),
    /// Elements of the list matching `selector`.
    ListElems {
        selector: Selector,
        pairing: Option<Pairing>,
        path: Option<PathMode>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    ValidateFalse(String),
    Required,
    Optional,
    Forbidden,
    MaxLength(usize),
    Minimum(f64),
    Maximum(f64),
    Enum(Vec<String>),
    Format(String),
    Immutable,
}

impl Directive {
    /// Tag name, used as the origin of the errors a directive produces.
    pub fn tag(&self) -> &'static str {
        self.kind.tag()
    }
}

impl DirectiveKind {
    pub fn tag(&self) -> &'static str {
        match self {
            DirectiveKind::Subfield { .. } => "subfield",
            DirectiveKind::UnionMember { .. } => "unionMember",
            DirectiveKind::UnionDiscriminator { .. } => "unionDiscriminator",
            DirectiveKind::Primitive(p) => p.tag(),
        }
    }
}

impl Primitive {
    pub fn tag(&self) -> &'static str {
        match self {
            Primitive::ValidateFalse(_) => "validateFalse",
            Primitive::Required => "required",
            Primitive::Optional => "optional",
            Primitive::Forbidden => "forbidden",
            Primitive::MaxLength(_) => "maxLength",
            Primitive::Minimum(_) => "minimum",
            Primitive::Maximum(_) => "maximum",
            Primitive::Enum(_) => "enum",
            Primitive::Format(_) => "format",
            Primitive::Immutable => "immutable",
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// PARSING
// ————————————————————————————————————————————————————————————————————————————

const TAGS: &[&str] = &[
    "subfield", "unionMember", "unionDiscriminator",
    "validateFalse", "required", "optional", "forbidden",
    "maxLength", "minimum", "maximum", "enum", "format", "immutable",
];

static FIELD_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$\-]*$").expect("static regex")
});

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct UnionArgs {
    #[serde(default)]
    union: String,
    #[serde(default)]
    member_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ListElemsArgs {
    #[serde(rename = "listElems")]
    list_elems: Map<String, Value>,
    #[serde(default)]
    pairing: Option<Pairing>,
    #[serde(default)]
    path: Option<PathMode>,
    #[serde(default, alias = "Flags")]
    flags: Flags,
}

impl TryFrom<Value> for Directive {
    type Error = DirectiveError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(mut map) = value else { return Err(DirectiveError::NotAnObject) };

        let mut flags = match map.remove("flags") {
            Some(raw) => arg::<Flags>("flags", raw)?,
            None => Flags::default(),
        };
        let payload = map.remove("payload");

        let mut tags = map.keys().filter(|k| TAGS.contains(&k.as_str())).cloned().collect::<Vec<_>>();
        if let Some(unknown) = map.keys().find(|k| !TAGS.contains(&k.as_str())) {
            return Err(DirectiveError::UnknownTag(unknown.clone()));
        }
        let tag = match tags.len() {
            0 => return Err(DirectiveError::MissingTag(map.keys().cloned().collect())),
            1 => tags.remove(0),
            _ => return Err(DirectiveError::MultipleTags(tags)),
        };
        let raw = map.remove(&tag).unwrap_or(Value::Null);

        if payload.is_some() && tag != "subfield" {
            return Err(DirectiveError::UnexpectedPayload);
        }

        let kind = match tag.as_str() {
            "subfield" => {
                let (target, arg_flags) = parse_subfield_arg(raw)?;
                flags.short_circuit |= arg_flags.short_circuit;
                flags.non_error |= arg_flags.non_error;
                DirectiveKind::Subfield {
                    target,
                    payload: payload.map(parse_payload).transpose()?.unwrap_or_default(),
                }
            }
            "unionMember" => {
                let args = if raw.is_null() { UnionArgs::default() } else { arg::<UnionArgs>("unionMember", raw)? };
                DirectiveKind::UnionMember { union: args.union, member_name: args.member_name }
            }
            "unionDiscriminator" => {
                let args = if raw.is_null() { UnionArgs::default() } else { arg::<UnionArgs>("unionDiscriminator", raw)? };
                DirectiveKind::UnionDiscriminator { union: args.union }
            }
            "validateFalse" => DirectiveKind::Primitive(Primitive::ValidateFalse(arg("validateFalse", raw)?)),
            "required" => DirectiveKind::Primitive(Primitive::Required),
            "optional" => DirectiveKind::Primitive(Primitive::Optional),
            "forbidden" => DirectiveKind::Primitive(Primitive::Forbidden),
            "immutable" => DirectiveKind::Primitive(Primitive::Immutable),
            "maxLength" => DirectiveKind::Primitive(Primitive::MaxLength(arg("maxLength", raw)?)),
            "minimum" => DirectiveKind::Primitive(Primitive::Minimum(arg("minimum", raw)?)),
            "maximum" => DirectiveKind::Primitive(Primitive::Maximum(arg("maximum", raw)?)),
            "enum" => DirectiveKind::Primitive(Primitive::Enum(arg("enum", raw)?)),
            "format" => DirectiveKind::Primitive(Primitive::Format(arg("format", raw)?)),
            other => return Err(DirectiveError::UnknownTag(other.to_string())),
        };
        Ok(Directive { kind, flags })
    }
}

/// One directive or a list of them.
fn parse_payload(raw: Value) -> Result<Vec<Directive>, DirectiveError> {
    match raw {
        Value::Array(items) => items.into_iter().map(Directive::try_from).collect(),
        Value::Null => Ok(Vec::new()),
        one => Ok(vec![Directive::try_from(one)?]),
    }
}

fn arg<T: serde::de::DeserializeOwned>(tag: &'static str, raw: Value) -> Result<T, DirectiveError> {
    serde_json::from_value(raw).map_err(|source| DirectiveError::BadArgument { tag, source })
}

/// The subfield argument is either a bare field name, a selector object, or
/// a `{"listElems": {...}}` object, which may carry its own `flags`. Either
/// object form may also arrive as a JSON string literal.
fn parse_subfield_arg(raw: Value) -> Result<(SubfieldTarget, Flags), DirectiveError> {
    match raw {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Err(DirectiveError::EmptyArgument);
            }
            if trimmed.starts_with('{') {
                let parsed = serde_json::from_str::<Value>(trimmed)
                    .map_err(|_| DirectiveError::MalformedArgument(s.clone()))?;
                return parse_subfield_arg(parsed);
            }
            if !FIELD_NAME.is_match(trimmed) {
                return Err(DirectiveError::MalformedArgument(s.clone()));
            }
            Ok((SubfieldTarget::Field(trimmed.to_string()), Flags::default()))
        }
        Value::Object(map) if map.contains_key("listElems") => {
            let args = arg::<ListElemsArgs>("subfield", Value::Object(map))?;
            let target = SubfieldTarget::ListElems {
                selector: parse_selector(args.list_elems)?,
                pairing: args.pairing,
                path: args.path,
            };
            Ok((target, args.flags))
        }
        Value::Object(map) => {
            let target = SubfieldTarget::ListElems { selector: parse_selector(map)?, pairing: None, path: None };
            Ok((target, Flags::default()))
        }
        other => Err(DirectiveError::MalformedArgument(other.to_string())),
    }
}

fn parse_selector(map: Map<String, Value>) -> Result<Selector, DirectiveError> {
    if map.is_empty() {
        return Err(DirectiveError::EmptySelector);
    }
    map.into_iter()
        .map(|(k, v)| match v {
            Value::String(s) => Ok((k, s)),
            _ => Err(DirectiveError::SelectorValueNotString(k)),
        })
        .collect()
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(v: Value) -> Result<Directive, DirectiveError> {
        Directive::try_from(v)
    }

    fn target(v: Value) -> Result<SubfieldTarget, DirectiveError> {
        parse_subfield_arg(v).map(|(target, _)| target)
    }

    #[test]
    fn bare_field_subfield() {
        let d = parse(json!({"subfield": "name", "payload": {"maxLength": 5}})).unwrap();
        match d.kind {
            DirectiveKind::Subfield { target: SubfieldTarget::Field(name), payload } => {
                assert_eq!(name, "name");
                assert_eq!(payload[0].kind, DirectiveKind::Primitive(Primitive::MaxLength(5)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn selector_forms_are_equivalent() {
        let a = target(json!({"type": "Approved"})).unwrap();
        let b = target(json!(r#"{"type":"Approved"}"#)).unwrap();
        let c = target(json!({"listElems": {"type": "Approved"}})).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn list_elems_modes_parse() {
        let t = target(json!({"listElems": {"type": "A"}, "pairing": "first", "path": "index"})).unwrap();
        assert_eq!(t, SubfieldTarget::ListElems {
            selector: Selector::from([("type".to_string(), "A".to_string())]),
            pairing: Some(Pairing::First),
            path: Some(PathMode::PerIndex),
        });
    }

    #[test]
    fn list_elems_flags_merge_into_directive_flags() {
        let d = parse(json!({
            "subfield": {"listElems": {"type": "A"}, "flags": {"ShortCircuit": true}},
            "payload": {"required": {}},
        })).unwrap();
        assert_eq!(d.flags, Flags::SHORT_CIRCUIT);
        assert!(matches!(d.kind, DirectiveKind::Subfield { target: SubfieldTarget::ListElems { .. }, .. }));

        let d = parse(json!({
            "subfield": r#"{"listElems": {"type": "A"}, "flags": {"nonError": true}}"#,
            "flags": {"shortCircuit": true},
        })).unwrap();
        assert_eq!(d.flags, Flags::STOP_SILENTLY);
    }

    #[test]
    fn malformed_and_empty_selectors_are_rejected() {
        assert!(matches!(target(json!({})), Err(DirectiveError::EmptySelector)));
        assert!(matches!(target(json!({"listElems": {}})), Err(DirectiveError::EmptySelector)));
        assert!(matches!(target(json!("{not json")), Err(DirectiveError::MalformedArgument(_))));
        assert!(matches!(target(json!("")), Err(DirectiveError::EmptyArgument)));
        assert!(matches!(target(json!({"type": 1})), Err(DirectiveError::SelectorValueNotString(_))));
    }

    #[test]
    fn union_directives_default_to_unnamed_union() {
        let d = parse(json!({"unionMember": {}})).unwrap();
        assert_eq!(d.kind, DirectiveKind::UnionMember { union: String::new(), member_name: None });
        let d = parse(json!({"unionDiscriminator": {"union": "src"}})).unwrap();
        assert_eq!(d.kind, DirectiveKind::UnionDiscriminator { union: "src".into() });
    }

    #[test]
    fn flags_ride_along() {
        let d = parse(json!({"validateFalse": "x", "flags": {"shortCircuit": true}})).unwrap();
        assert!(d.flags.short_circuit);
        assert_eq!(d.tag(), "validateFalse");
    }

    #[test]
    fn tag_errors() {
        assert!(matches!(parse(json!({"bogus": 1})), Err(DirectiveError::UnknownTag(_))));
        assert!(matches!(parse(json!({"required": {}, "forbidden": {}})), Err(DirectiveError::MultipleTags(_))));
        assert!(matches!(parse(json!({"required": {}, "payload": []})), Err(DirectiveError::UnexpectedPayload)));
        assert!(matches!(parse(json!("required")), Err(DirectiveError::NotAnObject)));
    }
}

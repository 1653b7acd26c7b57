// Schema IR: record types, their fields and the directives attached to both.
// Deserialized straight from the schema document.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::directive::Directive;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawTy", into = "RawTy")]
pub enum Ty {
    String,
    Integer,
    Number,
    Bool,
    Optional(Box<Ty>),       // nilable wrapper
    List(Box<Ty>),
    Map(Box<Ty>),            // keyed by string
    Record(String),          // by type name
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Schema {
    pub types: Vec<RecordDef>,
    /// Type validated when a caller does not name one.
    #[serde(default)]
    pub root: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordDef {
    pub name: String,
    #[serde(default)]
    pub directives: Vec<Directive>,
    #[serde(default)]
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    /// Wire name; defaults to `name`, `"-"` means the field has none.
    #[serde(default)]
    pub json: Option<String>,
    #[serde(rename = "type")]
    pub ty: Ty,
    /// Keys that make list elements unique (`listType=map`).
    #[serde(default)]
    pub list_map_keys: Vec<String>,
    #[serde(default)]
    pub directives: Vec<Directive>,
}

impl Field {
    pub fn wire_name(&self) -> Option<&str> {
        match self.json.as_deref() {
            Some("-") => None,
            Some(name) if !name.is_empty() => Some(name),
            _ => Some(self.name.as_str()),
        }
    }
}

impl Ty {
    /// Strip any `Optional` wrappers.
    pub fn non_optional(&self) -> &Ty {
        let mut t = self;
        while let Ty::Optional(inner) = t { t = inner; }
        t
    }

    pub fn is_nilable(&self) -> bool {
        matches!(self, Ty::Optional(_) | Ty::List(_) | Ty::Map(_))
    }

    /// `string` or `optional<string>`.
    pub fn is_string_kind(&self) -> bool {
        matches!(self.non_optional(), Ty::String)
    }

    pub fn is_numeric_kind(&self) -> bool {
        matches!(self.non_optional(), Ty::Integer | Ty::Number)
    }

    pub fn record_name(&self) -> Option<&str> {
        match self.non_optional() {
            Ty::Record(name) => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn list_elem(&self) -> Option<&Ty> {
        match self.non_optional() {
            Ty::List(elem) => Some(elem.as_ref()),
            _ => None,
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::String => write!(f, "string"),
            Ty::Integer => write!(f, "integer"),
            Ty::Number => write!(f, "number"),
            Ty::Bool => write!(f, "boolean"),
            Ty::Optional(inner) => write!(f, "optional<{inner}>"),
            Ty::List(inner) => write!(f, "list<{inner}>"),
            Ty::Map(inner) => write!(f, "map<string, {inner}>"),
            Ty::Record(name) => write!(f, "{name}"),
        }
    }
}

// ---------------------------- Wire form ----------------------------------- //

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawTy {
    Named(String),
    Optional { optional: Box<RawTy> },
    List { list: Box<RawTy> },
    Map { map: Box<RawTy> },
}

impl From<RawTy> for Ty {
    fn from(raw: RawTy) -> Self {
        match raw {
            RawTy::Named(name) => match name.as_str() {
                "string" => Ty::String,
                "integer" => Ty::Integer,
                "number" => Ty::Number,
                "boolean" | "bool" => Ty::Bool,
                _ => Ty::Record(name),
            },
            RawTy::Optional { optional } => Ty::Optional(Box::new((*optional).into())),
            RawTy::List { list } => Ty::List(Box::new((*list).into())),
            RawTy::Map { map } => Ty::Map(Box::new((*map).into())),
        }
    }
}

impl From<Ty> for RawTy {
    fn from(ty: Ty) -> Self {
        match ty {
            Ty::String => RawTy::Named("string".into()),
            Ty::Integer => RawTy::Named("integer".into()),
            Ty::Number => RawTy::Named("number".into()),
            Ty::Bool => RawTy::Named("boolean".into()),
            Ty::Optional(inner) => RawTy::Optional { optional: Box::new((*inner).into()) },
            Ty::List(inner) => RawTy::List { list: Box::new((*inner).into()) },
            Ty::Map(inner) => RawTy::Map { map: Box::new((*inner).into()) },
            Ty::Record(name) => RawTy::Named(name),
        }
    }
}

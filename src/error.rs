//! Error types. Validation failures are not errors: they are
//! [`crate::field::ErrorList`] values. Everything here is fatal for the
//! schema or the call that raised it.
use thiserror::Error;

/// A schema or directive that cannot be compiled. Compilation stops at the
/// first one; no partial validator is produced.
#[derive(Debug, Error)]
#[error("{location}: {kind}")]
pub struct CompileError {
    /// `Type` or `Type.field`, plus the directive path inside nested payloads.
    pub location: String,
    pub kind: CompileErrorKind,
}

impl CompileError {
    pub fn new(location: impl Into<String>, kind: CompileErrorKind) -> Self {
        Self { location: location.into(), kind }
    }
}

#[derive(Debug, Error)]
pub enum CompileErrorKind {
    #[error("record type {0:?} is declared more than once")]
    DuplicateType(String),
    #[error("wire name {0:?} is used by more than one field")]
    DuplicateField(String),
    #[error("unknown record type {0:?}")]
    UnknownType(String),
    #[error("record types reference themselves: {}", .0.join(" -> "))]
    RecursiveType(Vec<String>),

    #[error("subfield can only be used on record values, not {0}")]
    SubfieldOnNonRecord(String),
    #[error("no field with wire name {0:?}")]
    UnknownSubfield(String),
    #[error("list access via 'listElems' can only be used on lists, not {0}")]
    ListAccessOnNonList(String),
    #[error("list elements must be records for key-based selection, not {0}")]
    ListElementNotRecord(String),
    #[error("list access needs a field context; place the directive on a list field")]
    ListAccessWithoutMember,
    #[error("element type {element} has no field with wire name {key:?}")]
    SelectorUnknownField { element: String, key: String },
    #[error("selector key {key:?} of element type {element} must be a string or optional string field, not {ty}")]
    SelectorNotString { element: String, key: String, ty: String },

    #[error("{0} must be placed on a field")]
    UnionOutsideField(&'static str),
    #[error("union discriminator can only be used on string fields, not {0}")]
    DiscriminatorNotString(String),
    #[error("union discriminator must be a real field, not a list selection")]
    DiscriminatorOnVirtualMember,
    #[error("union {0:?} already has a discriminator")]
    DuplicateDiscriminator(String),
    #[error("union {union:?} has more than one member with discriminator value {value:?}")]
    DuplicateDiscriminatorValue { union: String, value: String },

    #[error("{directive} cannot check a value of type {ty}")]
    UnsupportedKind { directive: &'static str, ty: String },
    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern { pattern: String, source: regex::Error },
}

/// A directive that does not parse. Raised while deserializing the schema.
#[derive(Debug, Error)]
pub enum DirectiveError {
    #[error("a directive must be a JSON object")]
    NotAnObject,
    #[error("no directive tag in {0:?}")]
    MissingTag(Vec<String>),
    #[error("unknown directive tag {0:?}")]
    UnknownTag(String),
    #[error("more than one directive tag: {}", .0.join(", "))]
    MultipleTags(Vec<String>),
    #[error("'payload' is only allowed on subfield directives")]
    UnexpectedPayload,
    #[error("subfield argument cannot be an empty string")]
    EmptyArgument,
    #[error("subfield argument {0:?} is neither a field name nor a selector object")]
    MalformedArgument(String),
    #[error("'listElems' selector cannot be empty")]
    EmptySelector,
    #[error("selector value for key {0:?} must be a string")]
    SelectorValueNotString(String),
    #[error("bad argument for {tag}: {source}")]
    BadArgument { tag: &'static str, source: serde_json::Error },
}

/// Raised when a caller names a type the compiled schema does not have.
#[derive(Debug, Error)]
#[error("unknown record type {0:?}")]
pub struct UnknownType(pub String);

/// A document or schema that does not deserialize, with the JSON path of the
/// failure.
#[derive(Debug, Error)]
#[error("at JSON path {path} → {source}")]
pub struct LoadError {
    pub path: String,
    pub source: serde_json::Error,
}

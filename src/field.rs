//! Path-addressed validation errors.
//!
//! A [`Path`] names a node in a record tree (`spec.items[0].name`,
//! `conditions[type="Approved"]`). Every [`FieldError`] carries the path of the
//! node it is about, so nested validators only need to rebase paths, never
//! rewrite messages.
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

// ————————————————————————————————————————————————————————————————————————————
// PATH
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Child(String),
    Index(usize),
    Key(String),
}

/// Address of a node in a record tree. Cheap to extend: every builder method
/// returns a new path and leaves `self` untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    pub fn root() -> Self { Self::default() }

    pub fn new(name: impl Into<String>) -> Self {
        Self::root().child(name)
    }

    pub fn child(&self, name: impl Into<String>) -> Self {
        self.push(Segment::Child(name.into()))
    }

    pub fn index(&self, index: usize) -> Self {
        self.push(Segment::Index(index))
    }

    pub fn key(&self, key: impl Into<String>) -> Self {
        self.push(Segment::Key(key.into()))
    }

    pub fn segments(&self) -> &[Segment] { &self.segments }

    pub fn is_root(&self) -> bool { self.segments.is_empty() }

    fn push(&self, segment: Segment) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend(self.segments.iter().cloned());
        segments.push(segment);
        Self { segments }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Child(name) if i == 0 => write!(f, "{name}")?,
                Segment::Child(name) => write!(f, ".{name}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
                Segment::Key(key) => write!(f, "[{key}]")?,
            }
        }
        Ok(())
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// ERRORS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Invalid,
    Required,
    Forbidden,
    Duplicate,
    NotSupported,
    TooLong,
    Internal,
}

impl ErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::Invalid => "Invalid value",
            ErrorKind::Required => "Required value",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::Duplicate => "Duplicate value",
            ErrorKind::NotSupported => "Unsupported value",
            ErrorKind::TooLong => "Too long",
            ErrorKind::Internal => "Internal error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub kind: ErrorKind,
    pub path: Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bad_value: Option<Value>,
    pub detail: String,
    /// Directive that produced the error (e.g. `validateFalse`, `unionMember`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl FieldError {
    pub fn new(kind: ErrorKind, path: &Path, bad_value: Option<Value>, detail: impl Into<String>) -> Self {
        Self { kind, path: path.clone(), bad_value, detail: detail.into(), origin: None }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.path.is_root() {
            write!(f, "{}: ", self.path)?;
        }
        write!(f, "{}", self.kind.label())?;
        if let Some(value) = &self.bad_value {
            write!(f, ": {value}")?;
        }
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        Ok(())
    }
}

pub fn invalid(path: &Path, value: impl Into<Value>, detail: impl Into<String>) -> FieldError {
    FieldError::new(ErrorKind::Invalid, path, Some(value.into()), detail)
}

pub fn required(path: &Path, detail: impl Into<String>) -> FieldError {
    FieldError::new(ErrorKind::Required, path, None, detail)
}

pub fn forbidden(path: &Path, detail: impl Into<String>) -> FieldError {
    FieldError::new(ErrorKind::Forbidden, path, None, detail)
}

pub fn not_supported<S: AsRef<str>>(path: &Path, value: impl Into<Value>, valid: &[S]) -> FieldError {
    let quoted = valid.iter().map(|v| format!("`{}`", v.as_ref())).collect::<Vec<_>>();
    FieldError::new(
        ErrorKind::NotSupported,
        path,
        Some(value.into()),
        format!("supported values: {}", quoted.join(", ")),
    )
}

pub fn too_long(path: &Path, value: impl Into<Value>, max: usize) -> FieldError {
    FieldError::new(ErrorKind::TooLong, path, Some(value.into()), format!("must have at most {max} bytes"))
}

pub fn internal(path: &Path, detail: impl Into<String>) -> FieldError {
    FieldError::new(ErrorKind::Internal, path, None, detail)
}

// ————————————————————————————————————————————————————————————————————————————
// ERROR LIST
// ————————————————————————————————————————————————————————————————————————————

/// Ordered list of validation failures. Order is significant: validators emit
/// deterministically and callers compare lists verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ErrorList(Vec<FieldError>);

impl ErrorList {
    pub fn new() -> Self { Self::default() }

    pub fn push(&mut self, error: FieldError) { self.0.push(error); }

    pub fn append(&mut self, other: ErrorList) { self.0.extend(other.0); }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> { self.0.iter() }

    pub fn as_slice(&self) -> &[FieldError] { &self.0 }

    /// Stamp every error that has no origin yet.
    pub fn with_origin(self, origin: &str) -> Self {
        self.0
            .into_iter()
            .map(|e| if e.origin.is_some() { e } else { e.with_origin(origin) })
            .collect()
    }

    /// Details of errors produced by one directive origin, in emission order.
    pub fn details_from(&self, origin: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|e| e.origin.as_deref() == Some(origin))
            .map(|e| e.detail.as_str())
            .collect()
    }
}

impl From<FieldError> for ErrorList {
    fn from(error: FieldError) -> Self { Self(vec![error]) }
}

impl FromIterator<FieldError> for ErrorList {
    fn from_iter<I: IntoIterator<Item = FieldError>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<FieldError> for ErrorList {
    fn extend<I: IntoIterator<Item = FieldError>>(&mut self, iter: I) {
        self.0.extend(iter)
    }
}

impl IntoIterator for ErrorList {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;
    fn into_iter(self) -> Self::IntoIter { self.0.into_iter() }
}

impl<'a> IntoIterator for &'a ErrorList {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;
    fn into_iter(self) -> Self::IntoIter { self.0.iter() }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 { writeln!(f)?; }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_renders_children_indices_and_keys() {
        let p = Path::new("spec").child("conditions").key(r#"type="Approved""#).child("status");
        assert_eq!(p.to_string(), r#"spec.conditions[type="Approved"].status"#);
        assert_eq!(Path::new("items").index(3).child("name").to_string(), "items[3].name");
        assert_eq!(Path::root().to_string(), "");
    }

    #[test]
    fn child_does_not_mutate_parent() {
        let parent = Path::new("a");
        let _ = parent.child("b");
        assert_eq!(parent.segments().len(), 1);
    }

    #[test]
    fn error_display_matches_kind_layout() {
        let e = invalid(&Path::new("name"), "x", "bad");
        assert_eq!(e.to_string(), r#"name: Invalid value: "x": bad"#);
        let e = required(&Path::root(), "");
        assert_eq!(e.to_string(), "Required value");
        let e = not_supported(&Path::new("kind"), "C", &["A", "B"]);
        assert_eq!(e.to_string(), r#"kind: Unsupported value: "C": supported values: `A`, `B`"#);
    }

    #[test]
    fn with_origin_keeps_existing_origins() {
        let list: ErrorList = vec![
            required(&Path::root(), "").with_origin("required"),
            forbidden(&Path::root(), ""),
        ].into_iter().collect();
        let list = list.with_origin("subfield");
        assert_eq!(list.as_slice()[0].origin.as_deref(), Some("required"));
        assert_eq!(list.as_slice()[1].origin.as_deref(), Some("subfield"));
    }
}

//! Fixture files: a schema, the record type under test, and cases with the
//! errors each case must produce.
//!
//! ```json
//! {
//!   "schema": {"types": [...]},
//!   "type": "Struct",
//!   "cases": [
//!     {"name": "none set", "value": {"items": []},
//!      "expect": [{"path": "", "kind": "Invalid", "detail": "must specify exactly one of: ..."}]}
//!   ]
//! }
//! ```
//!
//! A fixture may instead carry `compileError`: a substring the compile error
//! of its schema must contain.
use std::path::{Path as FsPath, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::compiler::Validator;
use crate::error::{CompileError, LoadError};
use crate::field::{ErrorKind, ErrorList};
use crate::ir::Schema;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Fixture {
    #[serde(default)]
    pub description: Option<String>,
    pub schema: Schema,
    #[serde(rename = "type", default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub cases: Vec<Case>,
    #[serde(default)]
    pub compile_error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Case {
    pub name: String,
    pub value: Value,
    #[serde(default)]
    pub old: Option<Value>,
    #[serde(default)]
    pub expect: Vec<ExpectedError>,
}

/// Unset properties match anything.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpectedError {
    pub path: String,
    #[serde(default)]
    pub kind: Option<ErrorKind>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub origin: Option<String>,
}

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read {}: {source}", .path.display())]
    Io { path: PathBuf, source: std::io::Error },
    #[error("failed to parse {}: {source}", .path.display())]
    Parse { path: PathBuf, source: LoadError },
    #[error("schema does not compile: {0}")]
    Compile(#[from] CompileError),
    #[error("schema compiled, but a compile error containing {0:?} was expected")]
    ExpectedCompileError(String),
    #[error("compile error {actual:?} does not contain {expected:?}")]
    WrongCompileError { expected: String, actual: String },
    #[error("no record type to validate: set \"type\" or the schema's \"root\"")]
    NoType,
}

/// Result of one case. `failures` is empty when the case passed.
#[derive(Debug)]
pub struct CaseOutcome {
    pub name: String,
    pub failures: Vec<String>,
}

impl CaseOutcome {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

impl Fixture {
    pub fn load(path: &FsPath) -> Result<Self, FixtureError> {
        let bytes = std::fs::read(path).map_err(|source| FixtureError::Io { path: path.to_path_buf(), source })?;
        crate::path_de::from_slice_with_path(&bytes)
            .map_err(|source| FixtureError::Parse { path: path.to_path_buf(), source })
    }

    /// Compile the schema and run every case.
    pub fn run(&self) -> Result<Vec<CaseOutcome>, FixtureError> {
        let validator = match (Validator::compile(&self.schema), &self.compile_error) {
            (Ok(_), Some(expected)) => return Err(FixtureError::ExpectedCompileError(expected.clone())),
            (Err(err), Some(expected)) => {
                let actual = err.to_string();
                if actual.contains(expected.as_str()) {
                    return Ok(Vec::new());
                }
                return Err(FixtureError::WrongCompileError { expected: expected.clone(), actual });
            }
            (result, None) => result?,
        };

        let type_name = self
            .type_name
            .as_deref()
            .or(validator.root())
            .ok_or(FixtureError::NoType)?;

        let mut outcomes = Vec::with_capacity(self.cases.len());
        for case in &self.cases {
            let result = match &case.old {
                Some(old) => validator.validate_update(type_name, &case.value, old),
                None => validator.validate(type_name, &case.value),
            };
            let failures = match result {
                Ok(errs) => compare(&case.expect, &errs),
                Err(err) => vec![err.to_string()],
            };
            outcomes.push(CaseOutcome { name: case.name.clone(), failures });
        }
        Ok(outcomes)
    }
}

/// Errors must match one-to-one and in order.
pub fn compare(expected: &[ExpectedError], actual: &ErrorList) -> Vec<String> {
    let mut failures = Vec::new();
    for (i, want) in expected.iter().enumerate() {
        let Some(got) = actual.as_slice().get(i) else {
            failures.push(format!("missing error #{i} at {:?}", want.path));
            continue;
        };
        let rendered = got.path.to_string();
        if rendered != want.path {
            failures.push(format!("error #{i}: path {rendered:?}, expected {:?} ({got})", want.path));
        }
        if want.kind.is_some_and(|k| k != got.kind) {
            failures.push(format!("error #{i}: kind {:?}, expected {:?} ({got})", got.kind, want.kind));
        }
        if want.detail.as_ref().is_some_and(|d| *d != got.detail) {
            failures.push(format!("error #{i}: detail {:?}, expected {:?}", got.detail, want.detail));
        }
        if want.value.is_some() && want.value != got.bad_value {
            failures.push(format!("error #{i}: value {:?}, expected {:?}", got.bad_value, want.value));
        }
        if want.origin.is_some() && want.origin != got.origin {
            failures.push(format!("error #{i}: origin {:?}, expected {:?}", got.origin, want.origin));
        }
    }
    for extra in actual.iter().skip(expected.len()) {
        failures.push(format!("unexpected error: {extra}"));
    }
    failures
}

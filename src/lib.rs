//! Declarative, update-aware validation for JSON records.
//!
//! A schema document declares record types, their fields, and directives on
//! both. [`Validator::compile`] turns it into one validator per type; each
//! validator checks a new record, or a (new, old) pair on update, and returns
//! a path-addressed [`ErrorList`].
//!
//! ```
//! use json_vgen::{Schema, Validator};
//! use serde_json::json;
//!
//! let schema: Schema = serde_json::from_value(json!({"types": [{
//!     "name": "Struct",
//!     "fields": [
//!         {"name": "A", "json": "a", "type": {"optional": "string"}, "directives": [{"unionMember": {}}]},
//!         {"name": "B", "json": "b", "type": {"optional": "string"}, "directives": [{"unionMember": {}}]}
//!     ]
//! }]})).unwrap();
//! let validator = Validator::compile(&schema).unwrap();
//! let errs = validator.validate("Struct", &json!({"a": "x", "b": "y"})).unwrap();
//! assert_eq!(errs.to_string(), r#"Invalid value: "{a, b}": must specify exactly one of: `a`, `b`"#);
//! ```
pub mod cli;
pub mod compiler;
pub mod directive;
pub mod error;
pub mod field;
pub mod fixture;
pub mod ir;
pub mod lower;
pub mod matcher;
pub mod path_de;
pub mod validate;

pub use compiler::{Plan, Validator};
pub use error::{CompileError, CompileErrorKind, DirectiveError, LoadError, UnknownType};
pub use field::{ErrorKind, ErrorList, FieldError, Path};
pub use ir::Schema;
pub use validate::{Context, Operation};

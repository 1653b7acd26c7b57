//! Runtime validation library.
//!
//! Everything here is generic over the record type and holds no state between
//! calls: the compiler binds these functions to `serde_json::Value` records,
//! but native structs work the same way (see the tests).
//!
//! - [`path`]: canonical selector keys and virtual member names
//! - [`subfield`]: field delegation and list element pairing
//! - [`union`]: exactly-one-of and discriminated unions
//! - [`primitives`]: leaf checks over JSON values
pub mod path;
pub mod primitives;
pub mod subfield;
pub mod union;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::field::{ErrorList, Path};

pub use path::{canonical_selector_path, virtual_member_name};
pub use subfield::{list_map_element_by_key, subfield, ListAccess, Pairing, PathMode};
pub use union::{Discriminator, UnionMember, UnionMembership};

// ————————————————————————————————————————————————————————————————————————————
// CONTEXT
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operation {
    Create,
    Update,
}

/// Per-call validation context.
#[derive(Debug, Clone, Copy)]
pub struct Context {
    pub operation: Operation,
}

impl Context {
    pub fn create() -> Self { Self { operation: Operation::Create } }
    pub fn update() -> Self { Self { operation: Operation::Update } }
}

/// A validator over a (new, old) pair rooted at `path`.
pub type ValidateFn<T> = dyn Fn(&Context, &Path, Option<&T>, Option<&T>) -> ErrorList + Send + Sync;

// ————————————————————————————————————————————————————————————————————————————
// FLAGS + CHAINS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flags {
    /// Errors from this validator stop the remaining validators of the same target.
    #[serde(default, alias = "ShortCircuit")]
    pub short_circuit: bool,
    /// Errors are a stop signal only and are never reported.
    #[serde(default, alias = "NonError")]
    pub non_error: bool,
}

impl Flags {
    pub const SHORT_CIRCUIT: Flags = Flags { short_circuit: true, non_error: false };
    pub const STOP_SILENTLY: Flags = Flags { short_circuit: true, non_error: true };

    pub fn is_default(&self) -> bool {
        *self == Flags::default()
    }
}

/// One compiled directive: the validator plus how it composes with siblings.
pub struct Validation<T: ?Sized> {
    pub origin: String,
    pub flags: Flags,
    pub run: Arc<ValidateFn<T>>,
}

impl<T: ?Sized> Validation<T> {
    pub fn new(
        origin: impl Into<String>,
        flags: Flags,
        run: impl Fn(&Context, &Path, Option<&T>, Option<&T>) -> ErrorList + Send + Sync + 'static,
    ) -> Self {
        Self { origin: origin.into(), flags, run: Arc::new(run) }
    }
}

impl<T: ?Sized> Clone for Validation<T> {
    fn clone(&self) -> Self {
        Self { origin: self.origin.clone(), flags: self.flags, run: Arc::clone(&self.run) }
    }
}

impl<T: ?Sized> std::fmt::Debug for Validation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validation")
            .field("origin", &self.origin)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

/// Ordered validators for one target. Short-circuit validators always run
/// first, in declaration order; the rest follow in declaration order.
pub struct Chain<T: ?Sized> {
    validations: Vec<Validation<T>>,
}

impl<T: ?Sized> Default for Chain<T> {
    fn default() -> Self { Self { validations: Vec::new() } }
}

/// Result of running a [`Chain`].
pub struct ChainOutcome {
    pub errors: ErrorList,
    /// A short-circuit validator fired; callers skip any further descent.
    pub stopped: bool,
}

impl<T: ?Sized> Chain<T> {
    pub fn new(validations: impl IntoIterator<Item = Validation<T>>) -> Self {
        let (mut first, rest): (Vec<_>, Vec<_>) =
            validations.into_iter().partition(|v| v.flags.short_circuit);
        first.extend(rest);
        Self { validations: first }
    }

    pub fn call(&self, ctx: &Context, path: &Path, new: Option<&T>, old: Option<&T>) -> ChainOutcome {
        let mut errors = ErrorList::new();
        for v in &self.validations {
            let errs = (v.run)(ctx, path, new, old).with_origin(&v.origin);
            if errs.is_empty() {
                continue;
            }
            if v.flags.short_circuit {
                if !v.flags.non_error {
                    errors.append(errs);
                }
                return ChainOutcome { errors, stopped: true };
            }
            errors.append(errs);
        }
        ChainOutcome { errors, stopped: false }
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field;

    fn always(origin: &str, flags: Flags) -> Validation<str> {
        let detail = origin.to_string();
        Validation::new(origin, flags, move |_, path, _, _| field::invalid(path, "", detail.clone()).into())
    }

    fn never(origin: &str, flags: Flags) -> Validation<str> {
        Validation::new(origin, flags, |_, _, _, _| ErrorList::new())
    }

    #[test]
    fn chain_runs_short_circuit_first() {
        let chain = Chain::new([always("plain", Flags::default()), never("gate", Flags::SHORT_CIRCUIT)]);
        let out = chain.call(&Context::create(), &Path::root(), None, None);
        assert!(!out.stopped);
        assert_eq!(out.errors.details_from("plain"), vec!["plain"]);
    }

    #[test]
    fn short_circuit_stops_and_reports() {
        let chain = Chain::new([always("plain", Flags::default()), always("gate", Flags::SHORT_CIRCUIT)]);
        let out = chain.call(&Context::create(), &Path::root(), None, None);
        assert!(out.stopped);
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.errors.as_slice()[0].origin.as_deref(), Some("gate"));
    }

    #[test]
    fn non_error_stops_silently() {
        let chain = Chain::new([always("plain", Flags::default()), always("optional", Flags::STOP_SILENTLY)]);
        let out = chain.call(&Context::create(), &Path::root(), None, None);
        assert!(out.stopped);
        assert!(out.errors.is_empty());
    }

    #[test]
    fn flags_accept_pascal_case_keys() {
        let flags: Flags = serde_json::from_str(r#"{"ShortCircuit": true, "NonError": true}"#).unwrap();
        assert_eq!(flags, Flags::STOP_SILENTLY);
        let flags: Flags = serde_json::from_str(r#"{"shortCircuit": true}"#).unwrap();
        assert_eq!(flags, Flags::SHORT_CIRCUIT);
    }
}

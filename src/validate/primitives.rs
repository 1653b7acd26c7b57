//! Leaf checks over JSON values.
//!
//! Absent means missing or `null`; callers normalize that before calling in,
//! so every function here takes `Option<&Value>`. Checks other than the
//! presence checks pass absent values.
use regex::Regex;
use serde_json::Value;

use super::{Context, Operation};
use crate::field::{self, ErrorList, FieldError, ErrorKind, Path};

/// Fails unconditionally with `message`. Used to observe which validators run.
pub fn validate_false(_ctx: &Context, path: &Path, _new: Option<&Value>, _old: Option<&Value>, message: &str) -> ErrorList {
    FieldError::new(ErrorKind::Invalid, path, None, message).into()
}

pub fn required(_ctx: &Context, path: &Path, new: Option<&Value>, _old: Option<&Value>) -> ErrorList {
    match new {
        None => field::required(path, "").into(),
        Some(_) => ErrorList::new(),
    }
}

/// Reports when the value is absent. Compiled with [`super::Flags::STOP_SILENTLY`]
/// so the report only stops the remaining checks.
pub fn optional(_ctx: &Context, path: &Path, new: Option<&Value>, _old: Option<&Value>) -> ErrorList {
    match new {
        None => field::required(path, "optional value was not specified").into(),
        Some(_) => ErrorList::new(),
    }
}

pub fn forbidden(_ctx: &Context, path: &Path, new: Option<&Value>, _old: Option<&Value>) -> ErrorList {
    match new {
        Some(_) => field::forbidden(path, "").into(),
        None => ErrorList::new(),
    }
}

pub fn max_length(_ctx: &Context, path: &Path, new: Option<&Value>, _old: Option<&Value>, max: usize) -> ErrorList {
    match new.and_then(Value::as_str) {
        Some(s) if s.len() > max => field::too_long(path, s, max).into(),
        _ => ErrorList::new(),
    }
}

pub fn minimum(_ctx: &Context, path: &Path, new: Option<&Value>, _old: Option<&Value>, min: f64) -> ErrorList {
    match new {
        Some(v) if v.as_f64().is_some_and(|n| n < min) => {
            field::invalid(path, v.clone(), format!("must be greater than or equal to {}", render_bound(min))).into()
        }
        _ => ErrorList::new(),
    }
}

pub fn maximum(_ctx: &Context, path: &Path, new: Option<&Value>, _old: Option<&Value>, max: f64) -> ErrorList {
    match new {
        Some(v) if v.as_f64().is_some_and(|n| n > max) => {
            field::invalid(path, v.clone(), format!("must be less than or equal to {}", render_bound(max))).into()
        }
        _ => ErrorList::new(),
    }
}

pub fn one_of(_ctx: &Context, path: &Path, new: Option<&Value>, _old: Option<&Value>, allowed: &[String]) -> ErrorList {
    match new.and_then(Value::as_str) {
        Some(s) if !allowed.iter().any(|a| a == s) => field::not_supported(path, s, allowed).into(),
        _ => ErrorList::new(),
    }
}

pub fn format(_ctx: &Context, path: &Path, new: Option<&Value>, _old: Option<&Value>, pattern: &Regex) -> ErrorList {
    match new.and_then(Value::as_str) {
        Some(s) if !pattern.is_match(s) => {
            field::invalid(path, s, format!("must match the regex `{}`", pattern.as_str())).into()
        }
        _ => ErrorList::new(),
    }
}

/// On update, the value may not change, be set, or be cleared.
pub fn immutable(ctx: &Context, path: &Path, new: Option<&Value>, old: Option<&Value>) -> ErrorList {
    if ctx.operation == Operation::Update && new != old {
        return field::forbidden(path, "field is immutable").into();
    }
    ErrorList::new()
}

// Integers print without a trailing `.0`.
fn render_bound(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

// ------------------------------- Tests ------------------------------------ //

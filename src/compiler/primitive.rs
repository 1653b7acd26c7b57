use regex::Regex;
use serde_json::Value;

use super::Scope;
use crate::directive::Primitive;
use crate::error::{CompileError, CompileErrorKind};
use crate::ir::Ty;
use crate::lower::is_set;
use crate::validate::{primitives, Flags, Validation};

/// Bind one leaf directive to the value type of `scope`.
pub(super) fn compile(scope: &Scope, primitive: &Primitive, flags: Flags) -> Result<Validation<Value>, CompileError> {
    let tag = primitive.tag();
    let unsupported = || CompileError::new(
        &scope.location,
        CompileErrorKind::UnsupportedKind { directive: tag, ty: scope.ty.to_string() },
    );

    let validation = match primitive {
        Primitive::ValidateFalse(message) => {
            let message = message.clone();
            Validation::<Value>::new(tag, flags, move |ctx, path, new, old| {
                primitives::validate_false(ctx, path, new, old, &message)
            })
        }
        Primitive::Required => {
            let ty = scope.ty.clone();
            Validation::<Value>::new(tag, flags, move |ctx, path, new, old| {
                primitives::required(ctx, path, present(&ty, new), old)
            })
        }
        Primitive::Optional => {
            let ty = scope.ty.clone();
            Validation::<Value>::new(tag, flags, move |ctx, path, new, old| {
                primitives::optional(ctx, path, present(&ty, new), old)
            })
        }
        Primitive::Forbidden => {
            let ty = scope.ty.clone();
            Validation::<Value>::new(tag, flags, move |ctx, path, new, old| {
                primitives::forbidden(ctx, path, present(&ty, new), old)
            })
        }
        Primitive::Immutable => Validation::<Value>::new(tag, flags, primitives::immutable),
        Primitive::MaxLength(max) => {
            if !scope.ty.is_string_kind() {
                return Err(unsupported());
            }
            let max = *max;
            Validation::<Value>::new(tag, flags, move |ctx, path, new, old| primitives::max_length(ctx, path, new, old, max))
        }
        Primitive::Minimum(min) => {
            if !scope.ty.is_numeric_kind() {
                return Err(unsupported());
            }
            let min = *min;
            Validation::<Value>::new(tag, flags, move |ctx, path, new, old| primitives::minimum(ctx, path, new, old, min))
        }
        Primitive::Maximum(max) => {
            if !scope.ty.is_numeric_kind() {
                return Err(unsupported());
            }
            let max = *max;
            Validation::<Value>::new(tag, flags, move |ctx, path, new, old| primitives::maximum(ctx, path, new, old, max))
        }
        Primitive::Enum(allowed) => {
            if !scope.ty.is_string_kind() {
                return Err(unsupported());
            }
            let allowed = allowed.clone();
            Validation::<Value>::new(tag, flags, move |ctx, path, new, old| primitives::one_of(ctx, path, new, old, &allowed))
        }
        Primitive::Format(pattern) => {
            if !scope.ty.is_string_kind() {
                return Err(unsupported());
            }
            let rx = Regex::new(pattern).map_err(|source| CompileError::new(
                &scope.location,
                CompileErrorKind::InvalidPattern { pattern: pattern.clone(), source },
            ))?;
            Validation::<Value>::new(tag, flags, move |ctx, path, new, old| primitives::format(ctx, path, new, old, &rx))
        }
    };
    Ok(validation)
}

fn present<'a>(ty: &Ty, value: Option<&'a Value>) -> Option<&'a Value> {
    value.filter(|v| is_set(ty, v))
}

use std::sync::Arc;

use serde_json::Value;

use super::plan::DirectivePlan;
use super::{Compiler, Member, Scope};
use crate::directive::{Directive, Selector, SubfieldTarget};
use crate::error::{CompileError, CompileErrorKind};
use crate::lower::FieldAccessor;
use crate::matcher::ElementMatcher;
use crate::validate::{
    list_map_element_by_key, subfield, virtual_member_name, Chain, Flags, ListAccess, Pairing, PathMode,
    Validation,
};

impl Compiler<'_> {
    pub(super) fn compile_subfield(
        &mut self,
        scope: &Scope,
        target: &SubfieldTarget,
        payload: &[Directive],
        flags: Flags,
    ) -> Result<(Option<Validation<Value>>, DirectivePlan), CompileError> {
        match target {
            SubfieldTarget::Field(name) => self.compile_field_target(scope, name, payload, flags),
            SubfieldTarget::ListElems { selector, pairing, path } => {
                self.compile_list_target(scope, selector, *pairing, *path, payload, flags)
            }
        }
    }

    fn compile_field_target(
        &mut self,
        scope: &Scope,
        name: &str,
        payload: &[Directive],
        flags: Flags,
    ) -> Result<(Option<Validation<Value>>, DirectivePlan), CompileError> {
        let err = |kind| CompileError::new(&scope.location, kind);

        let table = self.table;
        let Some(record_name) = scope.ty.record_name() else {
            return Err(err(CompileErrorKind::SubfieldOnNonRecord(scope.ty.to_string())));
        };
        let record = table.get(record_name)
            .ok_or_else(|| err(CompileErrorKind::UnknownType(record_name.to_string())))?;
        let field = record.field(name)
            .ok_or_else(|| err(CompileErrorKind::UnknownSubfield(name.to_string())))?;

        let child = Scope {
            parent: Some(record.name.clone()),
            ty: field.accessor.ty.clone(),
            member: Member::Real(field.accessor.clone()),
            location: format!("{}.{}", scope.location, name),
        };
        let (validations, plans) = self.compile_directives(&child, payload)?;
        let plan = DirectivePlan {
            target: Some(name.to_string()),
            payload: plans,
            ..DirectivePlan::leaf("subfield", flags)
        };
        if validations.is_empty() {
            return Ok((None, plan));
        }

        let chain = Chain::new(validations);
        let accessor = field.accessor.clone();
        let segment = accessor.path_name().to_string();
        let validation = Validation::<Value>::new("subfield", flags, move |ctx, path, new, old| {
            subfield(ctx, path, new, old, &segment, |parent: &Value| accessor.get(parent), |ctx, path, new, old| {
                chain.call(ctx, path, new, old).errors
            })
        });
        Ok((Some(validation), plan))
    }

    fn compile_list_target(
        &mut self,
        scope: &Scope,
        selector: &Selector,
        pairing: Option<Pairing>,
        path_mode: Option<PathMode>,
        payload: &[Directive],
        flags: Flags,
    ) -> Result<(Option<Validation<Value>>, DirectivePlan), CompileError> {
        let err = |kind| CompileError::new(&scope.location, kind);
        let table = self.table;

        let Some(elem_ty) = scope.ty.list_elem() else {
            return Err(err(CompileErrorKind::ListAccessOnNonList(scope.ty.to_string())));
        };
        let Some(elem_name) = elem_ty.record_name() else {
            return Err(err(CompileErrorKind::ListElementNotRecord(elem_ty.to_string())));
        };
        let Member::Real(list_field) = &scope.member else {
            return Err(err(CompileErrorKind::ListAccessWithoutMember));
        };
        let element = table.get(elem_name)
            .ok_or_else(|| err(CompileErrorKind::UnknownType(elem_name.to_string())))?;
        let matcher = Arc::new(ElementMatcher::compile(element, selector).map_err(err)?);

        let access = list_access(list_field, selector, pairing, path_mode);
        tracing::debug!(
            location = %scope.location,
            selector = matcher.canonical(),
            ?access,
            "list access"
        );

        let child = Scope {
            parent: scope.parent.clone(),
            ty: elem_ty.clone(),
            member: Member::Virtual {
                name: virtual_member_name(&list_field.name, selector),
                list: list_field.clone(),
                matcher: Arc::clone(&matcher),
            },
            location: format!("{}[{}]", scope.location, matcher.canonical()),
        };
        let (validations, plans) = self.compile_directives(&child, payload)?;
        let plan = DirectivePlan {
            target: Some(matcher.canonical().to_string()),
            list_access: Some(access),
            payload: plans,
            ..DirectivePlan::leaf("subfield", flags)
        };
        if validations.is_empty() {
            return Ok((None, plan));
        }

        let chain = Chain::new(validations);
        let validation = Validation::<Value>::new("subfield", flags, move |ctx, path, new, old| {
            let new_list = new.and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);
            let old_list = old.and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);
            list_map_element_by_key(
                ctx,
                path,
                new_list,
                old_list,
                matcher.canonical(),
                |elem| matcher.matches(elem),
                access,
                |ctx, path, new, old| chain.call(ctx, path, new, old).errors,
            )
        });
        Ok((Some(validation), plan))
    }
}

/// Explicit modes win. Otherwise a selector covering every declared list-map
/// key names one element; anything else names a set.
fn list_access(
    list_field: &FieldAccessor,
    selector: &Selector,
    pairing: Option<Pairing>,
    path: Option<PathMode>,
) -> ListAccess {
    let keys = &list_field.list_map_keys;
    let default = if !keys.is_empty() && keys.iter().all(|k| selector.contains_key(k)) {
        ListAccess::UNIQUE
    } else {
        ListAccess::EACH
    };
    ListAccess {
        pairing: pairing.unwrap_or(default.pairing),
        path: path.unwrap_or(default.path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Ty;

    fn list_field(keys: &[&str]) -> FieldAccessor {
        FieldAccessor {
            name: "Conditions".into(),
            wire: Some("conditions".into()),
            ty: Ty::List(Box::new(Ty::Record("Condition".into()))),
            list_map_keys: keys.iter().map(|k| k.to_string()).collect(),
        }
    }

    fn sel(keys: &[&str]) -> Selector {
        keys.iter().map(|k| (k.to_string(), "x".to_string())).collect()
    }

    #[test]
    fn covered_map_keys_select_unique_access() {
        assert_eq!(list_access(&list_field(&["type"]), &sel(&["type"]), None, None), ListAccess::UNIQUE);
        assert_eq!(list_access(&list_field(&["type"]), &sel(&["type", "status"]), None, None), ListAccess::UNIQUE);
    }

    #[test]
    fn partial_or_missing_keys_select_each() {
        assert_eq!(list_access(&list_field(&["type", "reason"]), &sel(&["type"]), None, None), ListAccess::EACH);
        assert_eq!(list_access(&list_field(&[]), &sel(&["type"]), None, None), ListAccess::EACH);
    }

    #[test]
    fn explicit_modes_override() {
        let access = list_access(&list_field(&["type"]), &sel(&["type"]), Some(Pairing::All), None);
        assert_eq!(access, ListAccess { pairing: Pairing::All, path: PathMode::Grouped });
        let access = list_access(&list_field(&[]), &sel(&["type"]), None, Some(PathMode::Grouped));
        assert_eq!(access, ListAccess { pairing: Pairing::All, path: PathMode::Grouped });
    }
}

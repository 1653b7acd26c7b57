//! Schema compiler.
//!
//! Compilation runs in three steps over the lowered type table:
//!
//! 1. every type's type-level and field-level directives compile into chains
//!    of validators, while union directives are only recorded;
//! 2. once all types are seen, each type's unions are emitted by name;
//! 3. in dependency order, each type gets one composed validator that runs its
//!    own chain, its unions, then every field's chain followed by descent into
//!    nested records, list elements and map values.
//!
//! The result is a [`Validator`]: a table of `Send + Sync` closures, one per
//! record type, plus a serializable [`Plan`] describing what was compiled.
mod plan;
mod primitive;
mod subfield;
mod union;

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::directive::{Directive, DirectiveKind, Primitive};
use crate::error::{CompileError, UnknownType};
use crate::field::{ErrorList, Path};
use crate::ir::{Schema, Ty};
use crate::lower::{lower_schema, FieldAccessor, RecordInfo, TypeTable};
use crate::matcher::ElementMatcher;
use crate::validate::{Chain, Context, Flags, UnionMembership, ValidateFn, Validation};

pub use plan::{DirectivePlan, FieldPlan, MemberPlan, Plan, TypePlan, UnionPlan};

type ValueFn = Arc<ValidateFn<Value>>;

fn value_fn(
    f: impl Fn(&Context, &Path, Option<&Value>, Option<&Value>) -> ErrorList + Send + Sync + 'static,
) -> ValueFn {
    Arc::new(f)
}

// ————————————————————————————————————————————————————————————————————————————
// SCOPE
// ————————————————————————————————————————————————————————————————————————————

/// What a directive is attached to.
#[derive(Debug, Clone)]
enum Member {
    /// The record itself.
    None,
    Real(FieldAccessor),
    /// Elements of `list` matching a selector.
    Virtual { name: String, list: FieldAccessor, matcher: Arc<ElementMatcher> },
}

#[derive(Debug, Clone)]
struct Scope {
    /// Record owning `member`; unions declared here belong to it.
    parent: Option<String>,
    /// Type of the value the directives check.
    ty: Ty,
    member: Member,
    /// `Type`, `Type.field`, `Type.list[k="v"].field`, ...
    location: String,
}

// ————————————————————————————————————————————————————————————————————————————
// DIRECTIVES
// ————————————————————————————————————————————————————————————————————————————

struct Compiler<'a> {
    table: &'a TypeTable,
    unions: union::Accumulator,
}

struct RecordParts {
    chain: Chain<Value>,
    plans: Vec<DirectivePlan>,
    fields: Vec<(Chain<Value>, Vec<DirectivePlan>)>,
}

impl Compiler<'_> {
    fn compile_record(&mut self, record: &RecordInfo) -> Result<RecordParts, CompileError> {
        let scope = Scope {
            parent: None,
            ty: Ty::Record(record.name.clone()),
            member: Member::None,
            location: record.name.clone(),
        };
        let (validations, plans) = self.compile_directives(&scope, &record.directives)?;

        let mut fields = Vec::with_capacity(record.fields.len());
        for f in &record.fields {
            let scope = Scope {
                parent: Some(record.name.clone()),
                ty: f.accessor.ty.clone(),
                member: Member::Real(f.accessor.clone()),
                location: format!("{}.{}", record.name, f.accessor.path_name()),
            };
            let (validations, plans) = self.compile_directives(&scope, &f.directives)?;
            fields.push((Chain::new(validations), plans));
        }
        Ok(RecordParts { chain: Chain::new(validations), plans, fields })
    }

    fn compile_directives(
        &mut self,
        scope: &Scope,
        directives: &[Directive],
    ) -> Result<(Vec<Validation<Value>>, Vec<DirectivePlan>), CompileError> {
        let mut validations = Vec::with_capacity(directives.len());
        let mut plans = Vec::with_capacity(directives.len());
        for d in directives {
            let flags = effective_flags(d, &scope.location);
            let (validation, plan) = match &d.kind {
                DirectiveKind::Primitive(p) => {
                    (Some(primitive::compile(scope, p, flags)?), DirectivePlan::leaf(d.tag(), flags))
                }
                DirectiveKind::Subfield { target, payload } => self.compile_subfield(scope, target, payload, flags)?,
                DirectiveKind::UnionMember { union, member_name } => {
                    let member = self.unions.add_member(scope, union, member_name.as_deref())?;
                    let plan = DirectivePlan {
                        target: Some(member),
                        union: Some(union.clone()),
                        ..DirectivePlan::leaf(d.tag(), flags)
                    };
                    (None, plan)
                }
                DirectiveKind::UnionDiscriminator { union } => {
                    let field = self.unions.add_discriminator(scope, union)?;
                    let plan = DirectivePlan {
                        target: Some(field),
                        union: Some(union.clone()),
                        ..DirectivePlan::leaf(d.tag(), flags)
                    };
                    (None, plan)
                }
            };
            validations.extend(validation);
            plans.push(plan);
        }
        Ok((validations, plans))
    }
}

fn effective_flags(d: &Directive, location: &str) -> Flags {
    if matches!(d.kind, DirectiveKind::Primitive(Primitive::Optional)) {
        return Flags::STOP_SILENTLY;
    }
    let mut flags = d.flags;
    if flags.non_error && !flags.short_circuit {
        tracing::warn!(location, tag = d.tag(), "nonError has no effect without shortCircuit; ignoring it");
        flags.non_error = false;
    }
    flags
}

// ————————————————————————————————————————————————————————————————————————————
// TYPE VALIDATORS
// ————————————————————————————————————————————————————————————————————————————

struct FieldStep {
    accessor: FieldAccessor,
    chain: Chain<Value>,
    descend: Option<ValueFn>,
}

fn type_validator(chain: Chain<Value>, unions: Vec<UnionMembership<Value, Value>>, fields: Vec<FieldStep>) -> ValueFn {
    value_fn(move |ctx, path, new, old| {
        let Some(new) = new else { return ErrorList::new() };
        let mut errs = ErrorList::new();

        let out = chain.call(ctx, path, Some(new), old);
        errs.append(out.errors);
        if out.stopped {
            return errs;
        }
        for u in &unions {
            errs.append(u.validate(ctx, path, Some(new)).with_origin("unionMember"));
        }
        for f in &fields {
            let field_path = path.child(f.accessor.path_name());
            let new_value = f.accessor.get(new);
            let old_value = old.and_then(|o| f.accessor.get(o));
            let out = f.chain.call(ctx, &field_path, new_value, old_value);
            errs.append(out.errors);
            if out.stopped {
                continue;
            }
            if let Some(descend) = &f.descend {
                errs.append(descend(ctx, &field_path, new_value, old_value));
            }
        }
        errs
    })
}

/// Validator for a value of type `ty` that reaches nested records, or `None`
/// when no record is reachable. `list_map_keys` pairs old list elements
/// with new ones; only the outermost list of a field declares them. Lists
/// without keys pair elements by position.
fn descend(types: &IndexMap<String, ValueFn>, ty: &Ty, list_map_keys: &[String]) -> Option<ValueFn> {
    match ty {
        Ty::String | Ty::Integer | Ty::Number | Ty::Bool => None,
        Ty::Optional(inner) => descend(types, inner, list_map_keys),
        Ty::Record(name) => types.get(name).cloned(),
        Ty::List(elem) => {
            let each = descend(types, elem, &[])?;
            let keys = list_map_keys.to_vec();
            Some(value_fn(move |ctx, path, new, old| {
                let mut errs = ErrorList::new();
                let Some(items) = new.and_then(Value::as_array) else { return errs };
                let old_items = old.and_then(Value::as_array);
                for (i, item) in items.iter().enumerate() {
                    if item.is_null() {
                        continue;
                    }
                    let paired = match old_items {
                        Some(olds) if !keys.is_empty() => olds.iter().find(|o| same_keys(&keys, item, o)),
                        Some(olds) => olds.get(i).filter(|o| !o.is_null()),
                        None => None,
                    };
                    errs.append(each(ctx, &path.index(i), Some(item), paired));
                }
                errs
            }))
        }
        Ty::Map(elem) => {
            let each = descend(types, elem, &[])?;
            Some(value_fn(move |ctx, path, new, old| {
                let mut errs = ErrorList::new();
                let Some(entries) = new.and_then(Value::as_object) else { return errs };
                let old_entries = old.and_then(Value::as_object);
                for (key, value) in entries {
                    if value.is_null() {
                        continue;
                    }
                    let paired = old_entries.and_then(|o| o.get(key)).filter(|v| !v.is_null());
                    errs.append(each(ctx, &path.key(key), Some(value), paired));
                }
                errs
            }))
        }
    }
}

/// Both elements carry every key, with equal values.
fn same_keys(keys: &[String], a: &Value, b: &Value) -> bool {
    let key = |v: &Value, k: &str| v.get(k).filter(|x| !x.is_null()).cloned();
    keys.iter().all(|k| matches!((key(a, k), key(b, k)), (Some(x), Some(y)) if x == y))
}

// ————————————————————————————————————————————————————————————————————————————
// VALIDATOR
// ————————————————————————————————————————————————————————————————————————————

/// A compiled schema. Cheap to share across threads.
pub struct Validator {
    types: IndexMap<String, ValueFn>,
    plan: Plan,
    root: Option<String>,
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl Validator {
    pub fn compile(schema: &Schema) -> Result<Self, CompileError> {
        let table = lower_schema(schema)?;
        let mut compiler = Compiler { table: &table, unions: union::Accumulator::default() };

        let mut parts = Vec::with_capacity(table.len());
        for record in table.iter() {
            parts.push(compiler.compile_record(record)?);
        }

        let mut types: IndexMap<String, ValueFn> = IndexMap::with_capacity(table.len());
        let mut type_plans = Vec::with_capacity(table.len());
        for (record, parts) in table.iter().zip(parts) {
            let (unions, union_plans) = compiler.unions.emit(&record.name)?;

            let mut steps = Vec::with_capacity(record.fields.len());
            let mut field_plans = Vec::with_capacity(record.fields.len());
            for (info, (chain, plans)) in record.fields.iter().zip(parts.fields) {
                let accessor = info.accessor.clone();
                let descend = descend(&types, &accessor.ty, &accessor.list_map_keys);
                field_plans.push(FieldPlan {
                    name: accessor.name.clone(),
                    json: accessor.wire.clone(),
                    ty: accessor.ty.to_string(),
                    list_map_keys: accessor.list_map_keys.clone(),
                    directives: plans,
                });
                steps.push(FieldStep { accessor, chain, descend });
            }

            tracing::debug!(
                record = %record.name,
                fields = steps.len(),
                unions = unions.len(),
                "compiled type"
            );
            types.insert(record.name.clone(), type_validator(parts.chain, unions, steps));
            type_plans.push(TypePlan {
                name: record.name.clone(),
                directives: parts.plans,
                fields: field_plans,
                unions: union_plans,
            });
        }

        Ok(Self {
            types,
            plan: Plan { root: table.root.clone(), types: type_plans },
            root: table.root.clone(),
        })
    }

    /// Type validated when a caller does not name one.
    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    /// Validate a newly created record.
    pub fn validate(&self, type_name: &str, new: &Value) -> Result<ErrorList, UnknownType> {
        self.validate_with(&Context::create(), type_name, &Path::root(), Some(new), None)
    }

    /// Validate an update of `old` to `new`.
    pub fn validate_update(&self, type_name: &str, new: &Value, old: &Value) -> Result<ErrorList, UnknownType> {
        self.validate_with(&Context::update(), type_name, &Path::root(), Some(new), Some(old))
    }

    pub fn validate_with(
        &self,
        ctx: &Context,
        type_name: &str,
        path: &Path,
        new: Option<&Value>,
        old: Option<&Value>,
    ) -> Result<ErrorList, UnknownType> {
        let run = self.types.get(type_name).ok_or_else(|| UnknownType(type_name.to_string()))?;
        Ok(run(ctx, path, new.filter(|v| !v.is_null()), old.filter(|v| !v.is_null())))
    }
}

// ------------------------------- Tests ------------------------------------ //

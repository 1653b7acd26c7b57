// Union accumulation. Member and discriminator directives are scattered over
// fields (and over list selections inside field payloads), so they are
// collected per (record type, union name) while directives compile and only
// turned into validators once every type has been seen.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use super::plan::{MemberPlan, UnionPlan};
use super::{Member, Scope};
use crate::error::{CompileError, CompileErrorKind};
use crate::lower::FieldAccessor;
use crate::matcher::ElementMatcher;
use crate::validate::{Discriminator, UnionMember, UnionMembership};

/// How a member's value is found on the record owning the union.
#[derive(Debug, Clone)]
pub(super) enum MemberGetter {
    Field(FieldAccessor),
    /// First element of `list` matching the selector.
    ListScan { list: FieldAccessor, matcher: Arc<ElementMatcher> },
}

impl MemberGetter {
    fn get<'a>(&self, obj: &'a Value) -> Option<&'a Value> {
        match self {
            MemberGetter::Field(field) => field.get_set(obj),
            MemberGetter::ListScan { list, matcher } => list
                .get(obj)
                .and_then(Value::as_array)
                .and_then(|items| items.iter().find(|item| matcher.matches(item))),
        }
    }
}

#[derive(Debug)]
struct MemberDecl {
    name: String,
    discriminator_value: String,
    getter: MemberGetter,
}

#[derive(Debug, Default)]
struct UnionDecl {
    discriminator: Option<FieldAccessor>,
    members: Vec<MemberDecl>,
}

/// Record type -> union name -> declaration. Union names iterate sorted.
#[derive(Debug, Default)]
pub(super) struct Accumulator {
    by_type: IndexMap<String, BTreeMap<String, UnionDecl>>,
}

impl Accumulator {
    fn entry(&mut self, owner: &str, union: &str) -> &mut UnionDecl {
        self.by_type
            .entry(owner.to_string())
            .or_default()
            .entry(union.to_string())
            .or_default()
    }

    fn owner<'s>(scope: &'s Scope, tag: &'static str) -> Result<&'s str, CompileError> {
        match (&scope.parent, &scope.member) {
            (Some(parent), Member::Real(_) | Member::Virtual { .. }) => Ok(parent.as_str()),
            _ => Err(CompileError::new(&scope.location, CompileErrorKind::UnionOutsideField(tag))),
        }
    }

    /// Register the member in scope. Returns the member's name.
    pub(super) fn add_member(
        &mut self,
        scope: &Scope,
        union: &str,
        member_name: Option<&str>,
    ) -> Result<String, CompileError> {
        let owner = Self::owner(scope, "unionMember")?;
        let decl = match &scope.member {
            Member::Real(field) => MemberDecl {
                name: field.path_name().to_string(),
                discriminator_value: member_name.unwrap_or(&field.name).to_string(),
                getter: MemberGetter::Field(field.clone()),
            },
            Member::Virtual { name, list, matcher } => MemberDecl {
                name: name.clone(),
                discriminator_value: member_name.unwrap_or(name).to_string(),
                getter: MemberGetter::ListScan { list: list.clone(), matcher: Arc::clone(matcher) },
            },
            Member::None => {
                return Err(CompileError::new(&scope.location, CompileErrorKind::UnionOutsideField("unionMember")));
            }
        };
        let name = decl.name.clone();
        tracing::debug!(owner, union, member = %name, "union member");
        self.entry(owner, union).members.push(decl);
        Ok(name)
    }

    pub(super) fn add_discriminator(&mut self, scope: &Scope, union: &str) -> Result<String, CompileError> {
        let owner = Self::owner(scope, "unionDiscriminator")?;
        let field = match &scope.member {
            Member::Real(field) => field,
            _ => return Err(CompileError::new(&scope.location, CompileErrorKind::DiscriminatorOnVirtualMember)),
        };
        if !field.ty.is_string_kind() {
            return Err(CompileError::new(
                &scope.location,
                CompileErrorKind::DiscriminatorNotString(field.ty.to_string()),
            ));
        }
        let decl = self.entry(owner, union);
        if decl.discriminator.is_some() {
            return Err(CompileError::new(
                &scope.location,
                CompileErrorKind::DuplicateDiscriminator(union.to_string()),
            ));
        }
        decl.discriminator = Some(field.clone());
        Ok(field.path_name().to_string())
    }

    /// Build the union checks of one record type, by union name ascending.
    pub(super) fn emit(
        &self,
        owner: &str,
    ) -> Result<(Vec<UnionMembership<Value, Value>>, Vec<UnionPlan>), CompileError> {
        let Some(unions) = self.by_type.get(owner) else { return Ok((Vec::new(), Vec::new())) };

        let mut checks = Vec::with_capacity(unions.len());
        let mut plans = Vec::with_capacity(unions.len());
        for (union_name, decl) in unions {
            if decl.discriminator.is_some() {
                let mut seen = HashSet::new();
                for m in &decl.members {
                    if !seen.insert(m.discriminator_value.as_str()) {
                        return Err(CompileError::new(
                            owner,
                            CompileErrorKind::DuplicateDiscriminatorValue {
                                union: union_name.clone(),
                                value: m.discriminator_value.clone(),
                            },
                        ));
                    }
                }
            }

            let members: Vec<UnionMember<Value, Value>> = decl
                .members
                .iter()
                .map(|m| {
                    let getter = m.getter.clone();
                    UnionMember::new(m.name.clone(), move |obj: &Value| getter.get(obj))
                        .with_discriminator_value(m.discriminator_value.clone())
                })
                .collect();

            let check = match &decl.discriminator {
                Some(field) => {
                    let accessor = field.clone();
                    let discriminator = Discriminator::new(field.path_name(), move |obj: &Value| {
                        accessor.get(obj).and_then(Value::as_str).unwrap_or("")
                    });
                    UnionMembership::discriminated(discriminator, members)
                }
                None => UnionMembership::new(members),
            };
            tracing::debug!(
                owner,
                union = %union_name,
                members = decl.members.len(),
                discriminated = decl.discriminator.is_some(),
                "emitting union"
            );
            checks.push(check);
            plans.push(UnionPlan {
                name: union_name.clone(),
                discriminator: decl.discriminator.as_ref().map(|f| f.path_name().to_string()),
                members: decl.members.iter().map(member_plan).collect(),
            });
        }
        Ok((checks, plans))
    }
}

fn member_plan(m: &MemberDecl) -> MemberPlan {
    let (list, selector) = match &m.getter {
        MemberGetter::Field(_) => (None, None),
        MemberGetter::ListScan { list, matcher } => {
            (Some(list.path_name().to_string()), Some(matcher.canonical().to_string()))
        }
    };
    MemberPlan {
        name: m.name.clone(),
        discriminator_value: m.discriminator_value.clone(),
        list,
        selector,
    }
}

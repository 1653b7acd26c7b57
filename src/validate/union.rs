//! Union checks: exactly one member set, or the member named by a
//! discriminator set.
//!
//! A member is `{name, discriminator value, getter}`. The getter returns the
//! member's value when it counts as set; whether the value lives in a field or
//! is found by scanning a list does not matter here.
use super::Context;
use crate::field::{self, ErrorList, Path};

type Getter<T, V> = Box<dyn Fn(&T) -> Option<&V> + Send + Sync>;
type DiscriminatorGetter<T> = Box<dyn Fn(&T) -> &str + Send + Sync>;

pub struct UnionMember<T: ?Sized, V: ?Sized> {
    name: String,
    discriminator_value: String,
    get: Getter<T, V>,
}

impl<T: ?Sized, V: ?Sized> UnionMember<T, V> {
    /// A member whose discriminator value is its own name.
    pub fn new(name: impl Into<String>, get: impl Fn(&T) -> Option<&V> + Send + Sync + 'static) -> Self {
        let name = name.into();
        Self { discriminator_value: name.clone(), name, get: Box::new(get) }
    }

    pub fn with_discriminator_value(mut self, value: impl Into<String>) -> Self {
        self.discriminator_value = value.into();
        self
    }

    pub fn get<'a>(&self, obj: &'a T) -> Option<&'a V> { (self.get)(obj) }
}

pub struct Discriminator<T: ?Sized> {
    field: String,
    get: DiscriminatorGetter<T>,
}

impl<T: ?Sized> Discriminator<T> {
    pub fn new(field: impl Into<String>, get: impl Fn(&T) -> &str + Send + Sync + 'static) -> Self {
        Self { field: field.into(), get: Box::new(get) }
    }
}

/// Every declared member of one union, in declaration order.
pub struct UnionMembership<T: ?Sized, V: ?Sized> {
    discriminator: Option<Discriminator<T>>,
    members: Vec<UnionMember<T, V>>,
}

impl<T: ?Sized, V: ?Sized> UnionMembership<T, V> {
    pub fn new(members: Vec<UnionMember<T, V>>) -> Self {
        Self { discriminator: None, members }
    }

    pub fn discriminated(discriminator: Discriminator<T>, members: Vec<UnionMember<T, V>>) -> Self {
        Self { discriminator: Some(discriminator), members }
    }

    /// Check `obj` against the union. Only the new object is consulted;
    /// nothing is reported when it is absent.
    pub fn validate(&self, ctx: &Context, path: &Path, obj: Option<&T>) -> ErrorList {
        match &self.discriminator {
            Some(d) => discriminated_union(ctx, path, obj, d, &self.members),
            None => union(ctx, path, obj, &self.members),
        }
    }
}

/// Exactly one member must be set.
pub fn union<T: ?Sized, V: ?Sized>(
    _ctx: &Context,
    path: &Path,
    obj: Option<&T>,
    members: &[UnionMember<T, V>],
) -> ErrorList {
    let Some(obj) = obj else { return ErrorList::new() };

    let set: Vec<&str> = members
        .iter()
        .filter(|m| m.get(obj).is_some())
        .map(|m| m.name.as_str())
        .collect();
    if set.len() == 1 {
        return ErrorList::new();
    }

    let detail = format!("must specify exactly one of: {}", quoted(members.iter().map(|m| m.name.as_str())));
    let value = if set.is_empty() { String::new() } else { format!("{{{}}}", set.join(", ")) };
    field::invalid(path, value, detail).into()
}

/// The member whose discriminator value equals the discriminator field must be
/// set. Other members are not checked.
pub fn discriminated_union<T: ?Sized, V: ?Sized>(
    _ctx: &Context,
    path: &Path,
    obj: Option<&T>,
    discriminator: &Discriminator<T>,
    members: &[UnionMember<T, V>],
) -> ErrorList {
    let Some(obj) = obj else { return ErrorList::new() };

    let value = (discriminator.get)(obj);
    let legal: Vec<&str> = members.iter().map(|m| m.discriminator_value.as_str()).collect();
    let Some(selected) = members.iter().find(|m| m.discriminator_value == value) else {
        return field::not_supported(&path.child(&discriminator.field), value, &legal).into();
    };
    if selected.get(obj).is_some() {
        return ErrorList::new();
    }
    field::required(
        &path.child(&selected.name),
        format!(
            "must be specified when `{}` is {value:?} (discriminator values: {})",
            discriminator.field,
            quoted(legal.iter().copied()),
        ),
    )
    .into()
}

fn quoted<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.map(|n| format!("`{n}`")).collect::<Vec<_>>().join(", ")
}

// ------------------------------- Tests ------------------------------------ //

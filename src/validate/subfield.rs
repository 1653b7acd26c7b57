//! Field delegation and keyed list element access.
use serde::{Deserialize, Serialize};

use super::Context;
use crate::field::{ErrorList, Path};

/// Validate one field of a record: `validator` sees the field's new and old
/// values at `path.<field_name>`.
///
/// The getter only ever sees parents that exist; a missing old parent (create)
/// or new parent yields an absent value.
pub fn subfield<P, F>(
    ctx: &Context,
    path: &Path,
    new_parent: Option<&P>,
    old_parent: Option<&P>,
    field_name: &str,
    get: impl Fn(&P) -> Option<&F>,
    validator: impl Fn(&Context, &Path, Option<&F>, Option<&F>) -> ErrorList,
) -> ErrorList
where
    P: ?Sized,
    F: ?Sized,
{
    let new_value = new_parent.and_then(&get);
    let old_value = old_parent.and_then(&get);
    validator(ctx, &path.child(field_name), new_value, old_value)
}

// ————————————————————————————————————————————————————————————————————————————
// LIST ACCESS
// ————————————————————————————————————————————————————————————————————————————

/// How matching elements of the new and old lists are paired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pairing {
    /// Only the first match in each list; one validator call at most.
    First,
    /// Every match; new matches are paired in order with unconsumed old matches.
    All,
}

/// Which path errors of a matched element are reported under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathMode {
    /// `list[<canonical selector>]` for every match.
    Grouped,
    /// `list[i]`, the element's own index.
    #[serde(rename = "index")]
    PerIndex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ListAccess {
    pub pairing: Pairing,
    pub path: PathMode,
}

impl ListAccess {
    /// Selector names one key-unique entity.
    pub const UNIQUE: ListAccess = ListAccess { pairing: Pairing::First, path: PathMode::Grouped };
    /// Selector names a set of elements.
    pub const EACH: ListAccess = ListAccess { pairing: Pairing::All, path: PathMode::PerIndex };
}

/// Run `validator` over the elements of `new_list`/`old_list` selected by
/// `matches`, pairing new and old matches according to `access.pairing`.
///
/// `group_key` is the canonical selector, used as the path segment in
/// [`PathMode::Grouped`]. Elements that do not match are never visited.
pub fn list_map_element_by_key<T>(
    ctx: &Context,
    path: &Path,
    new_list: &[T],
    old_list: &[T],
    group_key: &str,
    matches: impl Fn(&T) -> bool,
    access: ListAccess,
    validator: impl Fn(&Context, &Path, Option<&T>, Option<&T>) -> ErrorList,
) -> ErrorList {
    let group_path = path.key(group_key);
    let element_path = |index: usize| match access.path {
        PathMode::Grouped => group_path.clone(),
        PathMode::PerIndex => path.index(index),
    };

    let mut errs = ErrorList::new();
    match access.pairing {
        Pairing::First => {
            let new_match = new_list.iter().enumerate().find(|(_, x)| matches(x));
            let old_match = old_list.iter().enumerate().find(|(_, x)| matches(x));
            let index = match (new_match, old_match) {
                (Some((i, _)), _) | (None, Some((i, _))) => i,
                (None, None) => return errs,
            };
            errs.append(validator(
                ctx,
                &element_path(index),
                new_match.map(|(_, x)| x),
                old_match.map(|(_, x)| x),
            ));
        }
        Pairing::All => {
            let mut consumed = vec![false; old_list.len()];
            for (i, item) in new_list.iter().enumerate() {
                if !matches(item) {
                    continue;
                }
                let mut paired = None;
                for (j, candidate) in old_list.iter().enumerate() {
                    if !consumed[j] && matches(candidate) {
                        consumed[j] = true;
                        paired = Some(candidate);
                        break;
                    }
                }
                errs.append(validator(ctx, &element_path(i), Some(item), paired));
            }
            for (j, item) in old_list.iter().enumerate() {
                if !consumed[j] && matches(item) {
                    errs.append(validator(ctx, &element_path(j), None, Some(item)));
                }
            }
        }
    }
    errs
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field;
    use std::cell::RefCell;

    #[derive(Debug, Clone, PartialEq)]
    struct Condition {
        kind: &'static str,
        status: &'static str,
    }

    fn cond(kind: &'static str, status: &'static str) -> Condition {
        Condition { kind, status }
    }

    type Calls = RefCell<Vec<(String, Option<Condition>, Option<Condition>)>>;

    fn record<'a>(calls: &'a Calls) -> impl Fn(&Context, &Path, Option<&Condition>, Option<&Condition>) -> ErrorList + 'a {
        move |_, path, new, old| {
            calls.borrow_mut().push((path.to_string(), new.cloned(), old.cloned()));
            ErrorList::new()
        }
    }

    fn is_a(c: &Condition) -> bool { c.kind == "A" }

    #[test]
    fn first_match_without_old() {
        let calls = Calls::default();
        let new = [cond("A", "False")];
        list_map_element_by_key(
            &Context::create(), &Path::new("conditions"), &new, &[], r#"type="A""#, is_a,
            ListAccess::UNIQUE, record(&calls),
        );
        assert_eq!(
            calls.into_inner(),
            vec![(r#"conditions[type="A"]"#.to_string(), Some(cond("A", "False")), None)],
        );
    }

    #[test]
    fn first_match_visits_nothing_without_matches() {
        let calls = Calls::default();
        list_map_element_by_key(
            &Context::update(), &Path::new("c"), &[cond("B", "x")], &[cond("C", "y")], "k", is_a,
            ListAccess::UNIQUE, record(&calls),
        );
        assert!(calls.into_inner().is_empty());
    }

    #[test]
    fn first_match_old_only_uses_old_index() {
        let calls = Calls::default();
        let access = ListAccess { pairing: Pairing::First, path: PathMode::PerIndex };
        list_map_element_by_key(
            &Context::update(), &Path::new("c"), &[], &[cond("B", "x"), cond("A", "y")], "k", is_a,
            access, record(&calls),
        );
        assert_eq!(calls.into_inner(), vec![("c[1]".to_string(), None, Some(cond("A", "y")))]);
    }

    #[test]
    fn all_matches_pair_in_order() {
        let calls = Calls::default();
        let new = [cond("A", "True"), cond("A", "False")];
        let old = [cond("A", "True")];
        list_map_element_by_key(
            &Context::update(), &Path::new("c"), &new, &old, r#"type="A""#, is_a,
            ListAccess { pairing: Pairing::All, path: PathMode::Grouped }, record(&calls),
        );
        let calls = calls.into_inner();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].1, Some(cond("A", "True")));
        assert_eq!(calls[0].2, Some(cond("A", "True")));
        assert_eq!(calls[1].1, Some(cond("A", "False")));
        assert_eq!(calls[1].2, None);
        assert!(calls.iter().all(|c| c.0 == r#"c[type="A"]"#));
    }

    #[test]
    fn all_matches_report_leftover_old_after_new() {
        let calls = Calls::default();
        let new = [cond("B", "x"), cond("A", "1")];
        let old = [cond("A", "old0"), cond("B", "y"), cond("A", "old2")];
        list_map_element_by_key(
            &Context::update(), &Path::new("c"), &new, &old, "k", is_a, ListAccess::EACH, record(&calls),
        );
        assert_eq!(
            calls.into_inner(),
            vec![
                ("c[1]".to_string(), Some(cond("A", "1")), Some(cond("A", "old0"))),
                ("c[2]".to_string(), None, Some(cond("A", "old2"))),
            ],
        );
    }

    #[test]
    fn errors_are_concatenated_in_visit_order() {
        let new = [cond("A", "1"), cond("A", "2")];
        let errs = list_map_element_by_key(
            &Context::create(), &Path::new("c"), &new, &[], "k", is_a, ListAccess::EACH,
            |_, path, new, _| field::invalid(path, new.map(|c| c.status).unwrap_or(""), "bad").into(),
        );
        let rendered: Vec<String> = errs.iter().map(|e| e.to_string()).collect();
        assert_eq!(rendered, vec![r#"c[0]: Invalid value: "1": bad"#, r#"c[1]: Invalid value: "2": bad"#]);
    }

    #[derive(Debug)]
    struct Parent {
        name: Option<String>,
    }

    #[test]
    fn subfield_rebases_path_and_reads_old() {
        let new = Parent { name: Some("n".into()) };
        let old = Parent { name: Some("o".into()) };
        let seen = RefCell::new(None);
        subfield(
            &Context::update(), &Path::new("spec"), Some(&new), Some(&old), "name",
            |p: &Parent| p.name.as_deref(),
            |_, path, n, o| {
                *seen.borrow_mut() = Some((path.to_string(), n.map(str::to_string), o.map(str::to_string)));
                ErrorList::new()
            },
        );
        assert_eq!(seen.into_inner(), Some(("spec.name".into(), Some("n".into()), Some("o".into()))));
    }

    #[test]
    fn subfield_without_old_parent_passes_absent() {
        let new = Parent { name: None };
        let errs = subfield(
            &Context::create(), &Path::root(), Some(&new), None, "name",
            |p: &Parent| p.name.as_deref(),
            |_, path, n, o| {
                assert!(n.is_none() && o.is_none());
                field::required(path, "").into()
            },
        );
        assert_eq!(errs.as_slice()[0].path.to_string(), "name");
    }
}

/// Canonical `k="v",...` form of a selector: keys sorted ascending, values
/// wrapped in double quotes and otherwise left as-is.
///
/// Used as the path segment of grouped list matches
/// (`conditions[status="True",type="Approved"]`) and as the seed of virtual
/// member names.
pub fn canonical_selector_path<K, V, I>(selector: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut pairs: Vec<(K, V)> = selector.into_iter().collect();
    pairs.sort_by(|a, b| a.0.as_ref().cmp(b.0.as_ref()));
    pairs
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k.as_ref(), v.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

pub const VIRTUAL_MEMBER_PREFIX: &str = "_subfield_";

/// Name of the virtual union member standing for "some element of
/// `list_field` matches `selector`".
///
/// `_subfield_Items_status_is_True_and_type_is_Approved`
pub fn virtual_member_name<K, V, I>(list_field: &str, selector: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let canonical = canonical_selector_path(selector);
    format!("{VIRTUAL_MEMBER_PREFIX}{list_field}_{}", sanitize(&canonical))
}

fn sanitize(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        match c {
            '"' => {}
            '=' => out.push_str("_is_"),
            ',' => out.push_str("_and_"),
            '[' | ']' | ':' => out.push('_'),
            c => out.push(c),
        }
    }
    out
}

// ------------------------------- Tests ------------------------------------ //

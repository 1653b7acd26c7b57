// Schema ingestion: the deserialized schema becomes a type table with one
// `{wire name -> accessor}` index per record, checked for duplicates, unknown
// references and recursion, and ordered so every record follows the records
// it references.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::Value;

use crate::directive::Directive;
use crate::error::{CompileError, CompileErrorKind};
use crate::ir::{Schema, Ty};

/// Reads one field out of a JSON record.
#[derive(Debug, Clone)]
pub struct FieldAccessor {
    pub name: String,
    pub wire: Option<String>,
    pub ty: Ty,
    pub list_map_keys: Vec<String>,
}

impl FieldAccessor {
    /// Path segment for errors about this field.
    pub fn path_name(&self) -> &str {
        self.wire.as_deref().unwrap_or(&self.name)
    }

    /// The field's value; missing and `null` are both absent.
    pub fn get<'a>(&self, obj: &'a Value) -> Option<&'a Value> {
        let wire = self.wire.as_deref()?;
        obj.get(wire).filter(|v| !v.is_null())
    }

    /// Whether a present value counts as set. Non-nilable scalars are set only
    /// when they differ from their zero value; every other kind is set when
    /// present, empty lists and maps included.
    pub fn is_set(&self, value: &Value) -> bool {
        is_set(&self.ty, value)
    }

    /// The field's value when it counts as set.
    pub fn get_set<'a>(&self, obj: &'a Value) -> Option<&'a Value> {
        self.get(obj).filter(|v| self.is_set(v))
    }
}

/// Presence convention for a value of type `ty`.
pub fn is_set(ty: &Ty, value: &Value) -> bool {
    match ty {
        Ty::String => value.as_str().is_some_and(|s| !s.is_empty()),
        Ty::Integer | Ty::Number => value.as_f64().is_some_and(|n| n != 0.0),
        Ty::Bool => value.as_bool() == Some(true),
        _ => !value.is_null(),
    }
}

#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub accessor: FieldAccessor,
    pub directives: Vec<Directive>,
}

#[derive(Debug, Clone)]
pub struct RecordInfo {
    pub name: String,
    pub directives: Vec<Directive>,
    pub fields: Vec<FieldInfo>,
    by_wire: HashMap<String, usize>,
}

impl RecordInfo {
    pub fn field(&self, wire: &str) -> Option<&FieldInfo> {
        self.by_wire.get(wire).map(|&i| &self.fields[i])
    }
}

/// Every record type of a schema, dependencies first.
#[derive(Debug, Clone)]
pub struct TypeTable {
    records: IndexMap<String, RecordInfo>,
    pub root: Option<String>,
}

impl TypeTable {
    pub fn get(&self, name: &str) -> Option<&RecordInfo> {
        self.records.get(name)
    }

    /// Records in dependency order.
    pub fn iter(&self) -> impl Iterator<Item = &RecordInfo> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

pub fn lower_schema(schema: &Schema) -> Result<TypeTable, CompileError> {
    let mut declared: IndexMap<String, RecordInfo> = IndexMap::new();

    for def in &schema.types {
        if declared.contains_key(&def.name) {
            return Err(CompileError::new(&def.name, CompileErrorKind::DuplicateType(def.name.clone())));
        }
        let mut by_wire = HashMap::new();
        let mut fields = Vec::with_capacity(def.fields.len());
        for (i, f) in def.fields.iter().enumerate() {
            let wire = f.wire_name().map(str::to_string);
            if let Some(w) = &wire {
                if by_wire.insert(w.clone(), i).is_some() {
                    return Err(CompileError::new(
                        format!("{}.{}", def.name, f.name),
                        CompileErrorKind::DuplicateField(w.clone()),
                    ));
                }
            }
            fields.push(FieldInfo {
                accessor: FieldAccessor {
                    name: f.name.clone(),
                    wire,
                    ty: f.ty.clone(),
                    list_map_keys: f.list_map_keys.clone(),
                },
                directives: f.directives.clone(),
            });
        }
        declared.insert(def.name.clone(), RecordInfo {
            name: def.name.clone(),
            directives: def.directives.clone(),
            fields,
            by_wire,
        });
    }

    // Unknown references
    for record in declared.values() {
        for f in &record.fields {
            for name in references(&f.accessor.ty) {
                if !declared.contains_key(name) {
                    return Err(CompileError::new(
                        format!("{}.{}", record.name, f.accessor.name),
                        CompileErrorKind::UnknownType(name.to_string()),
                    ));
                }
            }
        }
    }
    if let Some(root) = &schema.root {
        if !declared.contains_key(root) {
            return Err(CompileError::new("root", CompileErrorKind::UnknownType(root.clone())));
        }
    }

    let order = topological_order(&declared)?;
    let mut records = IndexMap::with_capacity(declared.len());
    for name in order {
        if let Some(info) = declared.swap_remove(&name) {
            records.insert(name, info);
        }
    }
    tracing::debug!(types = records.len(), "lowered schema");
    Ok(TypeTable { records, root: schema.root.clone() })
}

/// Record names referenced by a field type, through any wrappers.
fn references(ty: &Ty) -> Vec<&str> {
    match ty {
        Ty::Record(name) => vec![name.as_str()],
        Ty::Optional(inner) | Ty::List(inner) | Ty::Map(inner) => references(inner),
        Ty::String | Ty::Integer | Ty::Number | Ty::Bool => Vec::new(),
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Visiting,
    Done,
}

fn topological_order(records: &IndexMap<String, RecordInfo>) -> Result<Vec<String>, CompileError> {
    fn visit(
        name: &str,
        records: &IndexMap<String, RecordInfo>,
        marks: &mut HashMap<String, Mark>,
        stack: &mut Vec<String>,
        out: &mut Vec<String>,
    ) -> Result<(), CompileError> {
        match marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                let start = stack.iter().position(|n| n == name).unwrap_or(0);
                let mut cycle = stack[start..].to_vec();
                cycle.push(name.to_string());
                return Err(CompileError::new(name, CompileErrorKind::RecursiveType(cycle)));
            }
            None => {}
        }
        marks.insert(name.to_string(), Mark::Visiting);
        stack.push(name.to_string());
        if let Some(record) = records.get(name) {
            for f in &record.fields {
                for dep in references(&f.accessor.ty) {
                    visit(dep, records, marks, stack, out)?;
                }
            }
        }
        stack.pop();
        marks.insert(name.to_string(), Mark::Done);
        out.push(name.to_string());
        Ok(())
    }

    let mut marks = HashMap::new();
    let mut stack = Vec::new();
    let mut out = Vec::with_capacity(records.len());
    for name in records.keys() {
        visit(name, records, &mut marks, &mut stack, &mut out)?;
    }
    Ok(out)
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(v: Value) -> Schema {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn dependencies_come_first() {
        let table = lower_schema(&schema(json!({"types": [
            {"name": "Outer", "fields": [{"name": "inner", "type": {"list": "Inner"}}]},
            {"name": "Inner", "fields": [{"name": "leaf", "type": {"map": "Leaf"}}]},
            {"name": "Leaf", "fields": []},
        ]}))).unwrap();
        let names: Vec<&str> = table.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Leaf", "Inner", "Outer"]);
    }

    #[test]
    fn recursion_is_rejected() {
        let err = lower_schema(&schema(json!({"types": [
            {"name": "A", "fields": [{"name": "b", "type": {"optional": "B"}}]},
            {"name": "B", "fields": [{"name": "a", "type": {"list": "A"}}]},
        ]}))).unwrap_err();
        match err.kind {
            CompileErrorKind::RecursiveType(cycle) => assert_eq!(cycle, vec!["A", "B", "A"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_and_duplicate_names_are_rejected() {
        let err = lower_schema(&schema(json!({"types": [
            {"name": "A", "fields": [{"name": "b", "type": "Missing"}]},
        ]}))).unwrap_err();
        assert_eq!(err.location, "A.b");
        assert!(matches!(err.kind, CompileErrorKind::UnknownType(_)));

        let err = lower_schema(&schema(json!({"types": [
            {"name": "A", "fields": [
                {"name": "X", "json": "x", "type": "string"},
                {"name": "Y", "json": "x", "type": "string"},
            ]},
        ]}))).unwrap_err();
        assert!(matches!(err.kind, CompileErrorKind::DuplicateField(ref w) if w == "x"));

        let err = lower_schema(&schema(json!({"types": [{"name": "A"}, {"name": "A"}]}))).unwrap_err();
        assert!(matches!(err.kind, CompileErrorKind::DuplicateType(_)));
    }

    #[test]
    fn accessor_presence_follows_zero_values() {
        let table = lower_schema(&schema(json!({"types": [
            {"name": "A", "fields": [
                {"name": "s", "type": "string"},
                {"name": "o", "type": {"optional": "string"}},
                {"name": "l", "type": {"list": "string"}},
            ]},
        ]}))).unwrap();
        let a = table.get("A").unwrap();
        let obj = json!({"s": "", "o": "", "l": []});
        let get = |w: &str| a.field(w).unwrap().accessor.get_set(&obj);
        assert!(get("s").is_none());
        assert!(get("o").is_some());
        assert!(get("l").is_some());
        let nulls = json!({"o": null});
        assert!(a.field("o").unwrap().accessor.get(&nulls).is_none());
    }
}

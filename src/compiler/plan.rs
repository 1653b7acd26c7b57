//! Serializable description of a compiled schema, printed by `describe`.
use serde::Serialize;

use crate::validate::{Flags, ListAccess};

#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    pub types: Vec<TypePlan>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TypePlan {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub directives: Vec<DirectivePlan>,
    pub fields: Vec<FieldPlan>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unions: Vec<UnionPlan>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldPlan {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<String>,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub list_map_keys: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub directives: Vec<DirectivePlan>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectivePlan {
    pub tag: &'static str,
    #[serde(skip_serializing_if = "Flags::is_default")]
    pub flags: Flags,
    /// Field name or canonical selector.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_access: Option<ListAccess>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub union: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub payload: Vec<DirectivePlan>,
}

impl DirectivePlan {
    pub(crate) fn leaf(tag: &'static str, flags: Flags) -> Self {
        Self { tag, flags, target: None, list_access: None, union: None, payload: Vec::new() }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnionPlan {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<String>,
    pub members: Vec<MemberPlan>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberPlan {
    pub name: String,
    pub discriminator_value: String,
    /// Backing list field of a virtual member.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}

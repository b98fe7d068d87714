//! `__schema` / `__type` answers built from the static allow-lists and the
//! operation table.

use serde_json::{json, Value as JsonValue};
use trackql_common::{EntityKind, OperationKind, OPERATIONS};

use crate::query::Field;

pub const QUERY_TYPE: &str = "Query";

const SCALARS: [&str; 3] = ["Int", "String", "Boolean"];

/// Expands a type reference such as `[String!]!` into nested
/// `{kind, name, ofType}` objects.
fn type_ref(ty: &str) -> JsonValue {
    if let Some(inner) = ty.strip_suffix('!') {
        return json!({ "kind": "NON_NULL", "name": null, "ofType": type_ref(inner) });
    }
    if let Some(inner) = ty.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
        return json!({ "kind": "LIST", "name": null, "ofType": type_ref(inner) });
    }
    let kind = if SCALARS.contains(&ty) { "SCALAR" } else { "OBJECT" };
    json!({ "kind": kind, "name": ty, "ofType": null })
}

fn object_type(kind: EntityKind) -> JsonValue {
    let fields: Vec<_> = kind
        .allowed_fields()
        .iter()
        .map(|f| json!({ "name": f.name, "description": null, "args": [], "type": type_ref(f.ty) }))
        .collect();
    json!({
        "kind": "OBJECT",
        "name": kind.type_name(),
        "description": null,
        "fields": fields,
    })
}

fn query_type() -> JsonValue {
    let fields: Vec<_> = OPERATIONS
        .iter()
        .map(|op| {
            let (args, ty) = match op.op {
                OperationKind::List => (vec![], format!("[{}]", op.kind.type_name())),
                OperationKind::Lookup { arg, arg_type } => (
                    vec![json!({ "name": arg, "description": null, "type": type_ref(arg_type.as_str()), "defaultValue": null })],
                    op.kind.type_name().to_string(),
                ),
            };
            json!({ "name": op.name, "description": op.description, "args": args, "type": type_ref(&ty) })
        })
        .collect();
    json!({
        "kind": "OBJECT",
        "name": QUERY_TYPE,
        "description": null,
        "fields": fields,
    })
}

fn scalar_type(name: &str) -> JsonValue {
    json!({ "kind": "SCALAR", "name": name, "description": null, "fields": null })
}

fn all_types() -> Vec<JsonValue> {
    let mut types = vec![query_type()];
    types.extend(EntityKind::ALL.iter().map(|k| object_type(*k)));
    types.extend(SCALARS.iter().map(|s| scalar_type(s)));
    types
}

/// Full schema description. The mutation root is reserved and reported as
/// absent.
pub fn schema() -> JsonValue {
    json!({
        "queryType": { "name": QUERY_TYPE },
        "mutationType": null,
        "subscriptionType": null,
        "types": all_types(),
        "directives": [],
    })
}

pub fn named_type(name: &str) -> Option<JsonValue> {
    all_types().into_iter().find(|t| t["name"] == name)
}

/// Narrows `value` to the fields selected by `selection`. Unknown fields
/// resolve to null.
pub fn select(value: &JsonValue, selection: &[Field]) -> JsonValue {
    if selection.is_empty() {
        return value.clone();
    }
    match value {
        JsonValue::Array(items) => JsonValue::Array(items.iter().map(|v| select(v, selection)).collect()),
        JsonValue::Object(map) => {
            let mut out = serde_json::Map::with_capacity(selection.len());
            for field in selection {
                let v = map
                    .get(&field.name)
                    .map(|v| select(v, &field.selection_set))
                    .unwrap_or(JsonValue::Null);
                out.insert(field.response_key().to_string(), v);
            }
            JsonValue::Object(out)
        }
        other => other.clone(),
    }
}

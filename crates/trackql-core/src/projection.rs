//! Field-restricted views of backing records.
//!
//! Field resolution is an explicit match per record type: a name outside the
//! kind's allow-list has no arm and resolves to nothing, so a projection can
//! never leak an unlisted field even if validation were skipped.

use serde_json::{json, Value};
use trackql_common::{DocumentRecord, GroupRecord, PersonRecord, Record, UserRecord};

pub type Projection = serde_json::Map<String, Value>;

pub const TYPENAME_FIELD: &str = "__typename";

/// A requested field under its response key (alias or field name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedField {
    pub key: String,
    pub name: String,
}

impl ProjectedField {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self { key: name.clone(), name }
    }

    pub fn aliased(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self { key: key.into(), name: name.into() }
    }
}

pub trait Projectable {
    fn field_value(&self, field: &str) -> Option<Value>;
}

impl Projectable for UserRecord {
    fn field_value(&self, field: &str) -> Option<Value> {
        Some(match field {
            "id" => json!(self.id),
            "username" => json!(self.username),
            "email" => json!(self.email),
            "firstName" => json!(self.first_name),
            "lastName" => json!(self.last_name),
            "isActive" => json!(self.is_active),
            _ => return None,
        })
    }
}

impl Projectable for DocumentRecord {
    fn field_value(&self, field: &str) -> Option<Value> {
        Some(match field {
            "name" => json!(self.name),
            "title" => json!(self.title),
            "abstract" => json!(self.abstract_text),
            "rev" => json!(self.rev),
            "type" => json!(self.doc_type),
            "stream" => json!(self.stream),
            "group" => json!(self.group),
            "states" => json!(self.states),
            _ => return None,
        })
    }
}

impl Projectable for PersonRecord {
    fn field_value(&self, field: &str) -> Option<Value> {
        Some(match field {
            "id" => json!(self.id),
            "name" => json!(self.name),
            "ascii" => json!(self.ascii),
            "email" => json!(self.email),
            "user" => json!(self.user),
            _ => return None,
        })
    }
}

impl Projectable for GroupRecord {
    fn field_value(&self, field: &str) -> Option<Value> {
        Some(match field {
            "id" => json!(self.id),
            "name" => json!(self.name),
            "acronym" => json!(self.acronym),
            "type" => json!(self.group_type),
            "state" => json!(self.state),
            "description" => json!(self.description),
            _ => return None,
        })
    }
}

fn field_value(record: &Record, field: &str) -> Option<Value> {
    if field == TYPENAME_FIELD {
        return Some(json!(record.kind().type_name()));
    }
    match record {
        Record::User(r) => r.field_value(field),
        Record::Document(r) => r.field_value(field),
        Record::Person(r) => r.field_value(field),
        Record::Group(r) => r.field_value(field),
    }
}

/// Builds the projection of `record` holding exactly `fields`, in order.
pub fn project(record: &Record, fields: &[ProjectedField]) -> Projection {
    let mut out = Projection::with_capacity(fields.len());
    for f in fields {
        if let Some(value) = field_value(record, &f.name) {
            out.insert(f.key.clone(), value);
        }
    }
    out
}

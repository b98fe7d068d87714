use crate::kind::EntityKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic type of a lookup argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    Int,
    String,
}

impl ArgType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArgType::Int => "Int!",
            ArgType::String => "String!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    List,
    Lookup { arg: &'static str, arg_type: ArgType },
}

/// One root field of the query surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationSpec {
    pub name: &'static str,
    pub kind: EntityKind,
    pub op: OperationKind,
    pub description: &'static str,
}

impl OperationSpec {
    pub fn is_list(&self) -> bool {
        matches!(self.op, OperationKind::List)
    }
}

/// The dispatch table. Mutations are reserved and have no entries.
pub static OPERATIONS: &[OperationSpec] = &[
    OperationSpec {
        name: "allUsers",
        kind: EntityKind::User,
        op: OperationKind::List,
        description: "Active user accounts",
    },
    OperationSpec {
        name: "userById",
        kind: EntityKind::User,
        op: OperationKind::Lookup { arg: "id", arg_type: ArgType::Int },
        description: "User account by primary key",
    },
    OperationSpec {
        name: "allDocuments",
        kind: EntityKind::Document,
        op: OperationKind::List,
        description: "Documents",
    },
    OperationSpec {
        name: "documentByName",
        kind: EntityKind::Document,
        op: OperationKind::Lookup { arg: "name", arg_type: ArgType::String },
        description: "Document by name",
    },
    OperationSpec {
        name: "allPersons",
        kind: EntityKind::Person,
        op: OperationKind::List,
        description: "Persons",
    },
    OperationSpec {
        name: "personById",
        kind: EntityKind::Person,
        op: OperationKind::Lookup { arg: "id", arg_type: ArgType::Int },
        description: "Person by primary key",
    },
    OperationSpec {
        name: "allGroups",
        kind: EntityKind::Group,
        op: OperationKind::List,
        description: "Groups",
    },
    OperationSpec {
        name: "groupByAcronym",
        kind: EntityKind::Group,
        op: OperationKind::Lookup { arg: "acronym", arg_type: ArgType::String },
        description: "Group by acronym",
    },
];

pub fn find_operation(name: &str) -> Option<&'static OperationSpec> {
    OPERATIONS.iter().find(|op| op.name == name)
}

/// Exact-match key for a single-record lookup: integer primary key for
/// users and persons, natural string key for documents and groups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LookupKey {
    Id(i64),
    Name(String),
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupKey::Id(id) => write!(f, "{}", id),
            LookupKey::Name(name) => f.write_str(name),
        }
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// A projectable field under its wire name, and its type as reported by
/// introspection. Multi-word record fields are exposed in camelCase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub ty: &'static str,
}

const fn field(name: &'static str, ty: &'static str) -> FieldDef {
    FieldDef { name, ty }
}

static USER_FIELDS: &[FieldDef] = &[
    field("id", "Int!"),
    field("username", "String!"),
    field("email", "String!"),
    field("firstName", "String!"),
    field("lastName", "String!"),
    field("isActive", "Boolean!"),
];

static DOCUMENT_FIELDS: &[FieldDef] = &[
    field("name", "String!"),
    field("title", "String!"),
    field("abstract", "String!"),
    field("rev", "String!"),
    field("type", "String"),
    field("stream", "String"),
    field("group", "Int"),
    field("states", "[String!]!"),
];

static PERSON_FIELDS: &[FieldDef] = &[
    field("id", "Int!"),
    field("name", "String!"),
    field("ascii", "String!"),
    field("email", "String"),
    field("user", "Int"),
];

static GROUP_FIELDS: &[FieldDef] = &[
    field("id", "Int!"),
    field("name", "String!"),
    field("acronym", "String!"),
    field("type", "String"),
    field("state", "String"),
    field("description", "String!"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    User,
    Document,
    Person,
    Group,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::User,
        EntityKind::Document,
        EntityKind::Person,
        EntityKind::Group,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "User",
            EntityKind::Document => "Document",
            EntityKind::Person => "Person",
            EntityKind::Group => "Group",
        }
    }

    /// Name of the projected object type in query responses and introspection.
    pub fn type_name(&self) -> &'static str {
        match self {
            EntityKind::User => "UserType",
            EntityKind::Document => "DocumentType",
            EntityKind::Person => "PersonType",
            EntityKind::Group => "GroupType",
        }
    }

    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.type_name() == name)
    }

    /// The static allow-list of projectable fields, in declaration order.
    pub fn allowed_fields(&self) -> &'static [FieldDef] {
        match self {
            EntityKind::User => USER_FIELDS,
            EntityKind::Document => DOCUMENT_FIELDS,
            EntityKind::Person => PERSON_FIELDS,
            EntityKind::Group => GROUP_FIELDS,
        }
    }

    pub fn permits(&self, field: &str) -> bool {
        self.allowed_fields().iter().any(|f| f.name == field)
    }

    /// Whether `list_all` truncates this kind to the configured cap.
    ///
    /// Groups have always been returned in full while every other kind is
    /// capped. Kept as-is until someone confirms whether that was intended.
    pub fn is_list_capped(&self) -> bool {
        !matches!(self, EntityKind::Group)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

pub mod config;
pub mod error;
pub mod kind;
pub mod operation;

pub use error::GatewayError;
pub use kind::{EntityKind, FieldDef};
pub use operation::{ArgType, LookupKey, OperationKind, OperationSpec, OPERATIONS};

/// Account record. Only the fields listed in `EntityKind::User`'s allow-list
/// ever leave the gateway; `password` and the timestamps stay internal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_joined: Option<DateTime<Utc>>,
}

fn default_true() -> bool { true }

/// A tracked document (draft, RFC, charter, ...), keyed by its name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentRecord {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
    #[serde(default)]
    pub rev: String,
    /// Document type slug, e.g. `draft` or `charter`.
    #[serde(rename = "type", default)]
    pub doc_type: Option<String>,
    #[serde(default)]
    pub stream: Option<String>,
    /// Foreign key to `GroupRecord::id`.
    #[serde(default)]
    pub group: Option<i64>,
    /// State slugs, e.g. `active`, `rfc`.
    #[serde(default)]
    pub states: Vec<String>,
    #[serde(default)]
    pub external_url: String,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersonRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub ascii: String,
    /// Primary email address, if the person has one.
    #[serde(default)]
    pub email: Option<String>,
    /// Foreign key to `UserRecord::id`.
    #[serde(default)]
    pub user: Option<i64>,
    #[serde(default)]
    pub biography: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupRecord {
    pub id: i64,
    pub name: String,
    pub acronym: String,
    /// Group type slug, e.g. `wg`, `area`.
    #[serde(rename = "type", default)]
    pub group_type: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parent: Option<i64>,
    #[serde(default)]
    pub list_email: String,
}

/// One backing record of any kind, as handed out by a record store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "record")]
pub enum Record {
    User(UserRecord),
    Document(DocumentRecord),
    Person(PersonRecord),
    Group(GroupRecord),
}

impl Record {
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::User(_) => EntityKind::User,
            Record::Document(_) => EntityKind::Document,
            Record::Person(_) => EntityKind::Person,
            Record::Group(_) => EntityKind::Group,
        }
    }

    /// The key `get_by_key` matches this record on.
    pub fn lookup_key(&self) -> LookupKey {
        match self {
            Record::User(u) => LookupKey::Id(u.id),
            Record::Document(d) => LookupKey::Name(d.name.clone()),
            Record::Person(p) => LookupKey::Id(p.id),
            Record::Group(g) => LookupKey::Name(g.acronym.clone()),
        }
    }
}

impl From<UserRecord> for Record {
    fn from(r: UserRecord) -> Self { Record::User(r) }
}

impl From<DocumentRecord> for Record {
    fn from(r: DocumentRecord) -> Self { Record::Document(r) }
}

impl From<PersonRecord> for Record {
    fn from(r: PersonRecord) -> Self { Record::Person(r) }
}

impl From<GroupRecord> for Record {
    fn from(r: GroupRecord) -> Self { Record::Group(r) }
}

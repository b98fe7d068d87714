use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use trackql_common::{DocumentRecord, GroupRecord, PersonRecord, Record, UserRecord};

/// Seed data file: one array per record kind, all optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub documents: Vec<DocumentRecord>,
    #[serde(default)]
    pub persons: Vec<PersonRecord>,
    #[serde(default)]
    pub groups: Vec<GroupRecord>,
}

impl Fixture {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read fixture {}", path.display()))?;
        Self::from_json(&data).with_context(|| format!("invalid fixture {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.users.len() + self.documents.len() + self.persons.len() + self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_records(self) -> Vec<Record> {
        let mut records = Vec::with_capacity(self.len());
        records.extend(self.users.into_iter().map(Record::from));
        records.extend(self.documents.into_iter().map(Record::from));
        records.extend(self.persons.into_iter().map(Record::from));
        records.extend(self.groups.into_iter().map(Record::from));
        records
    }
}

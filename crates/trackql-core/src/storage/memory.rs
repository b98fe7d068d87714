use super::RecordStore;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use trackql_common::{EntityKind, LookupKey, Record};

/// Insertion-ordered in-process store. Used for tests and small fixture
/// deployments.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<EntityKind, Vec<Record>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `record`, replacing any existing record with the same key.
    pub async fn insert(&self, record: Record) {
        let mut records = self.records.write().await;
        let bucket = records.entry(record.kind()).or_default();
        let key = record.lookup_key();
        match bucket.iter().position(|r| r.lookup_key() == key) {
            Some(idx) => bucket[idx] = record,
            None => bucket.push(record),
        }
    }

    pub async fn extend(&self, records: impl IntoIterator<Item = Record>) {
        for record in records {
            self.insert(record).await;
        }
    }

    pub async fn len(&self, kind: EntityKind) -> usize {
        self.records.read().await.get(&kind).map_or(0, Vec::len)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list_all(&self, kind: EntityKind) -> Result<Vec<Record>> {
        let records = self.records.read().await;
        Ok(records.get(&kind).cloned().unwrap_or_default())
    }

    async fn get_by_key(&self, kind: EntityKind, key: &LookupKey) -> Result<Option<Record>> {
        let records = self.records.read().await;
        Ok(records
            .get(&kind)
            .and_then(|bucket| bucket.iter().find(|r| &r.lookup_key() == key))
            .cloned())
    }
}

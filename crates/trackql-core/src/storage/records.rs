use super::{KvStore, RecordStore};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::Path;
use trackql_common::{EntityKind, LookupKey, Record};

/// Records kept as JSON values in RocksDB under `<kind>:<key>`.
///
/// Integer keys are zero padded so a prefix scan yields primary-key order.
#[derive(Clone)]
pub struct KvRecordStore {
    kv: KvStore,
}

fn kind_prefix(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::User => "user:",
        EntityKind::Document => "document:",
        EntityKind::Person => "person:",
        EntityKind::Group => "group:",
    }
}

fn record_key(kind: EntityKind, key: &LookupKey) -> Vec<u8> {
    match key {
        LookupKey::Id(id) => format!("{}{:020}", kind_prefix(kind), id).into_bytes(),
        LookupKey::Name(name) => format!("{}{}", kind_prefix(kind), name).into_bytes(),
    }
}

fn decode(kind: EntityKind, key: &[u8], bytes: &[u8]) -> Result<Record> {
    let record: Record = serde_json::from_slice(bytes)
        .with_context(|| format!("corrupt record at key {}", String::from_utf8_lossy(key)))?;
    if record.kind() != kind {
        bail!(
            "record at key {} is a {} but was stored under {}",
            String::from_utf8_lossy(key),
            record.kind().as_str(),
            kind.as_str()
        );
    }
    Ok(record)
}

impl KvRecordStore {
    pub fn new(kv: KvStore) -> Self {
        Self { kv }
    }

    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let kv = tokio::task::spawn_blocking(move || KvStore::open(path)).await??;
        Ok(Self::new(kv))
    }

    pub async fn put_all(&self, records: Vec<Record>) -> Result<usize> {
        let pairs = records
            .iter()
            .map(|r| -> Result<(Vec<u8>, Vec<u8>)> {
                Ok((record_key(r.kind(), &r.lookup_key()), serde_json::to_vec(r)?))
            })
            .collect::<Result<Vec<_>>>()?;
        let count = pairs.len();
        let kv = self.kv.clone();
        tokio::task::spawn_blocking(move || {
            kv.put_batch(&pairs)?;
            kv.flush()
        }).await??;
        Ok(count)
    }

    #[cfg(test)]
    pub(crate) fn raw(&self) -> &KvStore {
        &self.kv
    }
}

#[async_trait]
impl RecordStore for KvRecordStore {
    async fn list_all(&self, kind: EntityKind) -> Result<Vec<Record>> {
        let kv = self.kv.clone();
        let pairs = tokio::task::spawn_blocking(move || kv.scan(kind_prefix(kind).as_bytes())).await??;
        pairs
            .iter()
            .map(|(k, v)| decode(kind, k, v))
            .collect()
    }

    async fn get_by_key(&self, kind: EntityKind, key: &LookupKey) -> Result<Option<Record>> {
        let kv = self.kv.clone();
        let raw_key = record_key(kind, key);
        let lookup_key = raw_key.clone();
        let bytes = tokio::task::spawn_blocking(move || kv.get(&lookup_key)).await??;
        bytes.map(|b| decode(kind, &raw_key, &b)).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use trackql_common::{DocumentRecord, PersonRecord};

    fn person(id: i64, name: &str) -> Record {
        Record::Person(PersonRecord {
            id,
            name: name.into(),
            ascii: name.into(),
            email: None,
            user: None,
            biography: String::new(),
        })
    }

    #[tokio::test]
    async fn test_roundtrip_by_key() -> Result<()> {
        let temp_dir = tempdir()?;
        let store = KvRecordStore::open(temp_dir.path()).await?;

        store.put_all(vec![person(10, "Alissa Cooper"), person(2, "Jari Arkko")]).await?;

        let found = store.get_by_key(EntityKind::Person, &LookupKey::Id(2)).await?;
        assert_eq!(found, Some(person(2, "Jari Arkko")));

        let missing = store.get_by_key(EntityKind::Person, &LookupKey::Id(3)).await?;
        assert!(missing.is_none());

        // Padded keys list in id order, not lexical order
        let all = store.list_all(EntityKind::Person).await?;
        let ids: Vec<_> = all.iter().map(Record::lookup_key).collect();
        assert_eq!(ids, vec![LookupKey::Id(2), LookupKey::Id(10)]);
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupt_value_is_an_error() -> Result<()> {
        let temp_dir = tempdir()?;
        let store = KvRecordStore::open(temp_dir.path()).await?;
        store.put_all(vec![Record::Document(DocumentRecord {
            name: "rfc9000".into(),
            title: "QUIC".into(),
            abstract_text: String::new(),
            rev: String::new(),
            doc_type: Some("rfc".into()),
            stream: Some("ietf".into()),
            group: None,
            states: vec![],
            external_url: String::new(),
            time: None,
        })]).await?;
        store.raw().put(b"document:draft-broken", b"not json")?;

        assert!(store.list_all(EntityKind::Document).await.is_err());
        assert!(store.get_by_key(EntityKind::Document, &LookupKey::Name("draft-broken".into())).await.is_err());
        assert!(store.get_by_key(EntityKind::Document, &LookupKey::Name("rfc9000".into())).await?.is_some());
        Ok(())
    }
}

pub mod kv;
pub mod memory;
pub mod records;
pub mod fixtures;

pub use fixtures::Fixture;
pub use kv::KvStore;
pub use memory::MemoryStore;
pub use records::KvRecordStore;

use anyhow::Result;
use async_trait::async_trait;
use trackql_common::{EntityKind, LookupKey, Record};

/// Read access to the system of record.
///
/// Implementations report infrastructure faults through `Err`; a lookup
/// that matches nothing is `Ok(None)`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Every record of `kind`, in whatever order the store yields them.
    async fn list_all(&self, kind: EntityKind) -> Result<Vec<Record>>;

    async fn get_by_key(&self, kind: EntityKind, key: &LookupKey) -> Result<Option<Record>>;
}

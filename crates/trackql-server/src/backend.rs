use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use trackql_common::config::{StorageBackend, StorageConfig};
use trackql_core::{Fixture, KvRecordStore, MemoryStore, RecordStore};

/// Opens the configured record store and applies the seed fixture, if any.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn RecordStore>> {
    let fixture = match &config.seed_file {
        Some(path) => Some(Fixture::load(path).await?),
        None => None,
    };

    match config.backend {
        StorageBackend::Memory => {
            let store = MemoryStore::new();
            match fixture {
                Some(fixture) => {
                    let count = fixture.len();
                    store.extend(fixture.into_records()).await;
                    tracing::info!("Seeded {} records into in-memory store", count);
                }
                None => tracing::warn!("In-memory store started empty. Set storage.seed_file to load records."),
            }
            Ok(Arc::new(store))
        }
        StorageBackend::RocksDb => {
            let path = Path::new(&config.root_dir).join("records");
            tokio::fs::create_dir_all(&path).await?;
            let store = KvRecordStore::open(&path).await?;
            tracing::info!("Opened RocksDB record store at {:?}", path);
            if let Some(fixture) = fixture {
                let count = store.put_all(fixture.into_records()).await?;
                tracing::info!("Seeded {} records into RocksDB store", count);
            }
            Ok(Arc::new(store))
        }
    }
}

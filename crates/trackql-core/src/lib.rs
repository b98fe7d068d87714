pub mod gateway;
pub mod introspection;
pub mod projection;
pub mod query;
pub mod storage;

pub use gateway::{GatewayPolicy, GraphRequest, Introspection, QueryGateway};
pub use projection::{project, ProjectedField, Projection};
pub use storage::{Fixture, KvRecordStore, MemoryStore, RecordStore};

// Re-export common types for convenience
pub use trackql_common::{EntityKind, GatewayError, LookupKey, Record};

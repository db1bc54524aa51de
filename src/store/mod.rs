//! Crash-tolerant persistence shared by every record kind.
//!
//! Each record kind is kept as one pretty-printed JSON document per record
//! under `<data_dir>/<kind>s/<id>.json`. The store provides:
//!
//! - atomic, lock-guarded writes with bounded retry on contention
//! - automatic backups before overwrites and deletes, rotated per record
//! - explicit recovery of damaged documents (repair, then reconstruction)
//! - full-scan queries with orchestration filtering and offset/limit
//! - an optional read-through cache invalidated on every write

mod atomic;
mod backup;
mod config;
mod error;
mod outcome;
mod query;
mod record;
mod record_store;
mod recovery;

pub use backup::{BackupReason, BackupRecord};
pub use config::{
    BACKUPS_VAR, CACHE_VAR, ConfigError, DATA_DIR_VAR, MAX_BACKUPS_VAR, StoreConfig,
};
pub use error::{StoreError, StoreResult};
pub use outcome::{BulkFailure, BulkOutcome, RemovalOutcome};
pub use query::RecordQuery;
pub use record::{Record, RecordKind};
pub use record_store::RecordStore;
pub use recovery::{Recovered, RecoveryMethod, Salvage};

#[cfg(test)]
mod tests;

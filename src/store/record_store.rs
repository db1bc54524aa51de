//! Generic file-backed store for one record kind.

use super::atomic::{WritePolicy, write_atomic};
use super::backup::{BackupManager, read_verified};
use super::recovery::repair_json;
use super::{
    BackupReason, BackupRecord, Record, RecordKind, RecordQuery, Recovered, RecoveryMethod,
    RemovalOutcome, Salvage, StoreConfig, StoreError, StoreResult,
};
use camino::{Utf8Path, Utf8PathBuf};
use mockable::{Clock, DefaultClock};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::io;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

const RECORD_SUFFIX: &str = ".json";

/// One JSON document per record under `<data_dir>/<kind>s/`.
///
/// Writes are atomic and, when enabled, preceded by a backup of the version
/// on disk. Loads never repair: a document that fails to parse surfaces as
/// [`StoreError::Corrupted`] until [`RecordStore::recover`] or
/// [`RecordStore::repair`] is called explicitly.
pub struct RecordStore<R: Record> {
    dir: Utf8PathBuf,
    backups: BackupManager,
    backups_enabled: bool,
    policy: WritePolicy,
    cache: Option<RwLock<HashMap<String, R>>>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl<R: Record> RecordStore<R> {
    /// Opens the store for `R` with the system clock, creating its directory
    /// if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the directory cannot be created.
    pub async fn open(config: &StoreConfig) -> StoreResult<Self> {
        Self::open_with_clock(config, Arc::new(DefaultClock)).await
    }

    /// Opens the store for `R`, stamping backups and reconstructed records
    /// with `clock`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the directory cannot be created.
    pub async fn open_with_clock(
        config: &StoreConfig,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> StoreResult<Self> {
        let dir = config.records_dir(R::KIND);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|error| StoreError::io(&dir, error))?;
        let policy = WritePolicy {
            attempts: config.write_attempts(),
            backoff: config.write_backoff(),
        };
        Ok(Self {
            backups: BackupManager::new(&config.backups_dir(), R::KIND, config.max_backups(), policy),
            backups_enabled: config.backups_enabled(),
            policy,
            cache: config.cache_enabled().then(|| RwLock::new(HashMap::new())),
            clock,
            dir,
        })
    }

    /// Returns the directory holding this kind's records.
    #[must_use]
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Returns the file path for record `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidId`] unless `id` is a non-empty run of
    /// ASCII letters, digits, `-` and `_`.
    pub fn path_for(&self, id: &str) -> StoreResult<Utf8PathBuf> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidId {
                kind: R::KIND,
                id: id.to_owned(),
            });
        }
        Ok(self.dir.join(format!("{id}{RECORD_SUFFIX}")))
    }

    /// Validates and atomically writes `record`.
    ///
    /// Returns the backup taken of the previous version, if any. Backup
    /// failures are logged and do not prevent the write.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ValidationFailed`] (nothing written) when the
    /// record violates its shape rules, or a storage error when the write
    /// fails.
    pub async fn save(&self, record: &R) -> StoreResult<Option<BackupRecord>> {
        self.write_record(record, BackupReason::Update).await
    }

    /// Loads record `id`.
    ///
    /// Returns `Ok(None)` when the record does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupted`] when the document does not parse and
    /// a storage error when it cannot be read.
    pub async fn load(&self, id: &str) -> StoreResult<Option<R>> {
        if let Some(cached) = self.cached(id) {
            return Ok(Some(cached));
        }
        let path = self.path_for(id)?;
        let Some(bytes) = read_optional(&path).await? else {
            return Ok(None);
        };
        let record = parse_document::<R>(R::KIND, id, &path, &bytes)?;
        if record.record_id() != id {
            return Err(StoreError::Corrupted {
                kind: R::KIND,
                id: id.to_owned(),
                path,
                reason: format!("document holds identifier {}", record.record_id()),
            });
        }
        self.cache_insert(id, record.clone());
        Ok(Some(record))
    }

    /// Loads record `id` as an alternative view type.
    ///
    /// Used for digests that skip bulky fields. Bypasses the cache.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupted`] when the document does not fit `V`
    /// and a storage error when it cannot be read.
    pub async fn load_as<V: DeserializeOwned>(&self, id: &str) -> StoreResult<Option<V>> {
        let path = self.path_for(id)?;
        let Some(bytes) = read_optional(&path).await? else {
            return Ok(None);
        };
        parse_document::<V>(R::KIND, id, &path, &bytes).map(Some)
    }

    /// Returns whether record `id` exists on disk.
    ///
    /// # Errors
    ///
    /// Returns a storage error when existence cannot be determined.
    pub async fn exists(&self, id: &str) -> StoreResult<bool> {
        let path = self.path_for(id)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|error| StoreError::io(path, error))
    }

    /// Backs up and removes record `id`. Absent records are a no-op.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the file cannot be removed.
    pub async fn delete(&self, id: &str) -> StoreResult<RemovalOutcome> {
        let path = self.path_for(id)?;
        self.invalidate(id);
        if !self.exists(id).await? {
            return Ok(RemovalOutcome::default());
        }
        let backup = self.backup_quietly(id, &path, BackupReason::Delete).await;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Ok(RemovalOutcome {
                    existed: false,
                    backup,
                });
            }
            Err(error) => return Err(StoreError::io(path, error)),
        }
        debug!(kind = %R::KIND, id, "record deleted");
        Ok(RemovalOutcome {
            existed: true,
            backup,
        })
    }

    /// Returns the identifiers of every stored record, sorted.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the directory cannot be listed.
    pub async fn list_ids(&self) -> StoreResult<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|error| StoreError::io(&self.dir, error))?;
        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|error| StoreError::io(&self.dir, error))?
        {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            if let Some(id) = name.strip_suffix(RECORD_SUFFIX) {
                ids.push(id.to_owned());
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Scans every record, keeping those matching `query` and `predicate`.
    ///
    /// Results are newest first. Records that fail to load are skipped with
    /// a warning.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the directory cannot be listed.
    pub async fn query(
        &self,
        query: &RecordQuery,
        predicate: impl Fn(&R) -> bool,
    ) -> StoreResult<Vec<R>> {
        let mut matches = Vec::new();
        for id in self.list_ids().await? {
            match self.load(&id).await {
                Ok(Some(record)) => {
                    if query.matches(&record) && predicate(&record) {
                        matches.push(record);
                    }
                }
                Ok(None) => {}
                Err(error) => {
                    warn!(kind = %R::KIND, id = %id, %error, "skipping unreadable record");
                }
            }
        }
        Ok(query.window(matches))
    }

    /// Recovers record `id` without writing anything.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when no file exists and a storage
    /// error when it cannot be read.
    pub async fn recover(&self, id: &str) -> StoreResult<Recovered<R>> {
        let path = self.path_for(id)?;
        let bytes = read_optional(&path)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                kind: R::KIND,
                id: id.to_owned(),
            })?;
        if let Ok(record) = serde_json::from_slice::<R>(&bytes) {
            return Ok(Recovered {
                record,
                method: RecoveryMethod::Intact,
            });
        }

        let text = String::from_utf8_lossy(&bytes);
        let repaired = repair_json(&text);
        if let Ok(record) = serde_json::from_str::<R>(&repaired) {
            info!(kind = %R::KIND, id, "record repaired");
            return Ok(Recovered {
                record,
                method: RecoveryMethod::Repaired,
            });
        }

        let salvage = Salvage::from_text(&repaired);
        warn!(
            kind = %R::KIND,
            id,
            salvaged_fields = salvage.len(),
            "record reconstructed from salvaged fields"
        );
        Ok(Recovered {
            record: R::reconstruct(id, &salvage, self.clock.utc()),
            method: RecoveryMethod::Reconstructed,
        })
    }

    /// Recovers record `id` and writes the result back when it was not
    /// intact. The damaged document is backed up first.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`RecordStore::recover`] and
    /// [`RecordStore::save`].
    pub async fn repair(&self, id: &str) -> StoreResult<Recovered<R>> {
        let recovered = self.recover(id).await?;
        if recovered.method != RecoveryMethod::Intact {
            self.save(&recovered.record).await?;
        }
        Ok(recovered)
    }

    /// Lists backups of record `id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the backup directory cannot be listed.
    pub async fn list_backups(&self, id: &str) -> StoreResult<Vec<BackupRecord>> {
        self.path_for(id)?;
        self.backups.list(id).await
    }

    /// Replaces the current record with the content of `backup`.
    ///
    /// The backup is verified against its checksum and validated before
    /// anything is written; the current version is itself backed up first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::BackupChecksumMismatch`] or
    /// [`StoreError::Corrupted`] for a damaged backup, and the errors of
    /// [`RecordStore::save`].
    pub async fn restore(&self, backup: &BackupRecord) -> StoreResult<R> {
        let bytes = read_verified(backup).await?;
        let id = backup.original_path.file_stem().unwrap_or_default();
        let record = parse_document::<R>(R::KIND, id, &backup.backup_path, &bytes)?;
        self.write_record(&record, BackupReason::Restore).await?;
        info!(kind = %R::KIND, id = %record.record_id(), backup = %backup.backup_path, "record restored");
        Ok(record)
    }

    async fn write_record(
        &self,
        record: &R,
        reason: BackupReason,
    ) -> StoreResult<Option<BackupRecord>> {
        let id = record.record_id();
        let violations = record.validate();
        if !violations.is_empty() {
            return Err(StoreError::ValidationFailed {
                kind: R::KIND,
                id,
                violations,
            });
        }
        let path = self.path_for(&id)?;
        let bytes =
            serde_json::to_vec_pretty(record).map_err(|error| StoreError::Serialization {
                kind: R::KIND,
                id: id.clone(),
                message: error.to_string(),
            })?;

        let backup = self.backup_quietly(&id, &path, reason).await;
        self.invalidate(&id);
        write_atomic(&path, Arc::from(bytes), self.policy).await?;
        self.invalidate(&id);
        debug!(kind = %R::KIND, id = %id, "record written");
        Ok(backup)
    }

    async fn backup_quietly(
        &self,
        id: &str,
        path: &Utf8Path,
        reason: BackupReason,
    ) -> Option<BackupRecord> {
        if !self.backups_enabled {
            return None;
        }
        match self.backups.backup(id, path, reason, self.clock.utc()).await {
            Ok(backup) => backup,
            Err(error) => {
                warn!(kind = %R::KIND, id, %error, "backup failed; continuing with write");
                None
            }
        }
    }

    fn cached(&self, id: &str) -> Option<R> {
        let cache = self.cache.as_ref()?;
        let guard = cache.read().ok()?;
        guard.get(id).cloned()
    }

    fn cache_insert(&self, id: &str, record: R) {
        if let Some(cache) = &self.cache {
            if let Ok(mut guard) = cache.write() {
                guard.insert(id.to_owned(), record);
            }
        }
    }

    fn invalidate(&self, id: &str) {
        if let Some(cache) = &self.cache {
            if let Ok(mut guard) = cache.write() {
                guard.remove(id);
            }
        }
    }
}

async fn read_optional(path: &Utf8Path) -> StoreResult<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(StoreError::io(path, error)),
    }
}

fn parse_document<T: DeserializeOwned>(
    kind: RecordKind,
    id: &str,
    path: &Utf8Path,
    bytes: &[u8],
) -> StoreResult<T> {
    serde_json::from_slice(bytes).map_err(|error| StoreError::Corrupted {
        kind,
        id: id.to_owned(),
        path: path.to_owned(),
        reason: error.to_string(),
    })
}

//! Per-record backup copies with rotation and checksum verification.
//!
//! Backups live under `<backups>/<kind>/<record-id>/`. Each backup is a
//! verbatim copy of the previous document (`<stamp>.json`) next to a
//! [`BackupRecord`] describing it (`<stamp>.meta.json`).

use super::atomic::{WritePolicy, write_atomic};
use super::{RecordKind, StoreError, StoreResult};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, warn};

const META_SUFFIX: &str = ".meta.json";
const DATA_SUFFIX: &str = ".json";

/// Why a backup was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupReason {
    /// The record was about to be overwritten.
    Update,
    /// The record was about to be deleted.
    Delete,
    /// The record was about to be replaced by a restored backup.
    Restore,
}

impl BackupReason {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Restore => "restore",
        }
    }
}

/// Description of one backup copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRecord {
    /// Record file that was copied.
    pub original_path: Utf8PathBuf,
    /// Location of the copy.
    pub backup_path: Utf8PathBuf,
    /// When the copy was taken.
    pub timestamp: DateTime<Utc>,
    /// Why the copy was taken.
    pub reason: BackupReason,
    /// Size of the copy in bytes.
    pub size: u64,
    /// Lower-case hex SHA-256 digest of the copy.
    pub checksum: String,
}

/// Writes, rotates and reads backups for one record kind.
#[derive(Debug, Clone)]
pub(crate) struct BackupManager {
    root: Utf8PathBuf,
    kind: RecordKind,
    max_backups: usize,
    policy: WritePolicy,
}

impl BackupManager {
    pub(crate) fn new(
        backups_dir: &Utf8Path,
        kind: RecordKind,
        max_backups: usize,
        policy: WritePolicy,
    ) -> Self {
        Self {
            root: backups_dir.join(kind.dir_name()),
            kind,
            max_backups: max_backups.max(1),
            policy,
        }
    }

    fn dir_for(&self, id: &str) -> Utf8PathBuf {
        self.root.join(id)
    }

    /// Copies the current document at `original` aside, stamped with
    /// `timestamp`.
    ///
    /// Returns `Ok(None)` when there is nothing on disk to back up.
    pub(crate) async fn backup(
        &self,
        id: &str,
        original: &Utf8Path,
        reason: BackupReason,
        timestamp: DateTime<Utc>,
    ) -> StoreResult<Option<BackupRecord>> {
        let bytes = match tokio::fs::read(original).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(StoreError::io(original, error)),
        };

        let stamp = timestamp.format("%Y%m%dT%H%M%S%.9fZ").to_string();
        let dir = self.dir_for(id);
        let backup_path = dir.join(format!("{stamp}{DATA_SUFFIX}"));
        let meta_path = dir.join(format!("{stamp}{META_SUFFIX}"));

        let record = BackupRecord {
            original_path: original.to_owned(),
            backup_path: backup_path.clone(),
            timestamp,
            reason,
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            checksum: sha256_hex(&bytes),
        };
        let meta = serde_json::to_vec_pretty(&record).map_err(|error| StoreError::Serialization {
            kind: self.kind,
            id: id.to_owned(),
            message: error.to_string(),
        })?;

        write_atomic(&backup_path, Arc::from(bytes), self.policy).await?;
        write_atomic(&meta_path, Arc::from(meta), self.policy).await?;
        debug!(kind = %self.kind, id, reason = reason.as_str(), path = %backup_path, "backup written");

        let removed = self.rotate(id).await?;
        if removed > 0 {
            debug!(kind = %self.kind, id, removed, "rotated old backups");
        }
        Ok(Some(record))
    }

    /// Deletes the oldest backups of `id` until at most `max_backups` remain.
    ///
    /// Age is the file modification time, ties broken by file name.
    pub(crate) async fn rotate(&self, id: &str) -> StoreResult<usize> {
        let mut backups = self.data_files(id).await?;
        if backups.len() <= self.max_backups {
            return Ok(0);
        }
        backups.sort();
        let excess = backups.len() - self.max_backups;
        for (_, path) in backups.iter().take(excess) {
            remove_if_present(path).await?;
            remove_if_present(&meta_path_for(path)).await?;
        }
        Ok(excess)
    }

    /// Lists the backups of `id`, newest first.
    ///
    /// Metadata files that cannot be read are skipped with a warning.
    pub(crate) async fn list(&self, id: &str) -> StoreResult<Vec<BackupRecord>> {
        let mut records = Vec::new();
        for (_, path) in self.data_files(id).await? {
            let meta_path = meta_path_for(&path);
            let parsed = tokio::fs::read(&meta_path)
                .await
                .map_err(|error| error.to_string())
                .and_then(|bytes| {
                    serde_json::from_slice::<BackupRecord>(&bytes).map_err(|error| error.to_string())
                });
            match parsed {
                Ok(record) => records.push(record),
                Err(reason) => {
                    warn!(kind = %self.kind, id, path = %meta_path, %reason, "skipping unreadable backup metadata");
                }
            }
        }
        records.sort_by(|left, right| {
            right
                .timestamp
                .cmp(&left.timestamp)
                .then_with(|| right.backup_path.cmp(&left.backup_path))
        });
        Ok(records)
    }

    async fn data_files(&self, id: &str) -> StoreResult<Vec<(SystemTime, Utf8PathBuf)>> {
        let dir = self.dir_for(id);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(StoreError::io(dir, error)),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|error| StoreError::io(&dir, error))?
        {
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if name.starts_with('.') || !name.ends_with(DATA_SUFFIX) || name.ends_with(META_SUFFIX)
            {
                continue;
            }
            let modified = entry
                .metadata()
                .await
                .and_then(|metadata| metadata.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            files.push((modified, dir.join(name)));
        }
        Ok(files)
    }
}

/// Reads a backup and verifies it against its recorded checksum.
pub(crate) async fn read_verified(backup: &BackupRecord) -> StoreResult<Vec<u8>> {
    let bytes = tokio::fs::read(&backup.backup_path)
        .await
        .map_err(|error| StoreError::io(&backup.backup_path, error))?;
    if sha256_hex(&bytes) != backup.checksum {
        return Err(StoreError::BackupChecksumMismatch {
            path: backup.backup_path.clone(),
        });
    }
    Ok(bytes)
}

fn meta_path_for(data_path: &Utf8Path) -> Utf8PathBuf {
    let stem = data_path.file_stem().unwrap_or_default();
    data_path.with_file_name(format!("{stem}{META_SUFFIX}"))
}

async fn remove_if_present(path: &Utf8Path) -> StoreResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(StoreError::io(path, error)),
    }
}

/// Returns the lower-case hex SHA-256 digest of `bytes`.
pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

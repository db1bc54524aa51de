//! Locked, atomic file replacement.
//!
//! A write takes an exclusive advisory lock on a hidden `.{name}.lock`
//! sidecar, writes the bytes to a hidden `.{name}.tmp` file in the same
//! directory, syncs it and renames it over the target. Readers therefore
//! observe either the previous document or the new one, never a mix.

use super::{StoreError, StoreResult};
use camino::{Utf8Path, Utf8PathBuf};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Retry policy applied when the sidecar lock is held elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WritePolicy {
    pub(crate) attempts: u32,
    pub(crate) backoff: Duration,
}

enum AttemptError {
    Locked,
    Io(io::Error),
}

impl From<io::Error> for AttemptError {
    fn from(error: io::Error) -> Self {
        Self::Io(error)
    }
}

/// Returns the lock sidecar guarding `path`.
pub(crate) fn lock_path_for(path: &Utf8Path) -> Utf8PathBuf {
    hidden_sibling(path, "lock")
}

fn temp_path_for(path: &Utf8Path) -> Utf8PathBuf {
    hidden_sibling(path, "tmp")
}

fn hidden_sibling(path: &Utf8Path, suffix: &str) -> Utf8PathBuf {
    let name = path.file_name().unwrap_or("record");
    path.with_file_name(format!(".{name}.{suffix}"))
}

/// Atomically replaces `path` with `bytes`, creating parent directories.
///
/// Lock contention is retried `policy.attempts` times with linear backoff;
/// any other failure is returned immediately.
pub(crate) async fn write_atomic(
    path: &Utf8Path,
    bytes: Arc<[u8]>,
    policy: WritePolicy,
) -> StoreResult<()> {
    let attempts = policy.attempts.max(1);
    for attempt in 1..=attempts {
        let target = path.to_owned();
        let payload = Arc::clone(&bytes);
        let outcome = tokio::task::spawn_blocking(move || write_locked(&target, &payload)).await;
        match outcome {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(AttemptError::Locked)) => {
                if attempt < attempts {
                    debug!(path = %path, attempt, "record file locked, retrying write");
                    tokio::time::sleep(policy.backoff * attempt).await;
                }
            }
            Ok(Err(AttemptError::Io(error))) => return Err(StoreError::io(path, error)),
            Err(join_error) => {
                return Err(StoreError::io(path, io::Error::other(join_error.to_string())));
            }
        }
    }
    Err(StoreError::LockContention {
        path: path.to_owned(),
        attempts,
    })
}

fn write_locked(path: &Utf8Path, bytes: &[u8]) -> Result<(), AttemptError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let lock_path = lock_path_for(path);
    let lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)?;
    if let Err(error) = FileExt::try_lock_exclusive(&lock_file) {
        return if is_contended(&error) {
            Err(AttemptError::Locked)
        } else {
            Err(AttemptError::Io(error))
        };
    }

    let result = replace_file(path, bytes);

    if let Err(error) = FileExt::unlock(&lock_file) {
        debug!(path = %lock_path, %error, "failed to release record lock");
    }
    drop(lock_file);
    if let Err(error) = fs::remove_file(&lock_path) {
        debug!(path = %lock_path, %error, "failed to remove record lock file");
    }

    result.map_err(AttemptError::Io)
}

fn is_contended(error: &io::Error) -> bool {
    if error.kind() == io::ErrorKind::WouldBlock {
        return true;
    }
    let contended = fs2::lock_contended_error().raw_os_error();
    error.raw_os_error().is_some() && error.raw_os_error() == contended
}

fn replace_file(path: &Utf8Path, bytes: &[u8]) -> io::Result<()> {
    let temp_path = temp_path_for(path);
    let written = write_synced(&temp_path, bytes).and_then(|()| fs::rename(&temp_path, path));
    if written.is_err() {
        if let Err(error) = fs::remove_file(&temp_path) {
            debug!(path = %temp_path, %error, "failed to remove temporary record file");
        }
    }
    written
}

fn write_synced(path: &Utf8Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

//! Tests for locked atomic writes.

use super::temp_config;
use crate::store::StoreError;
use crate::store::atomic::{WritePolicy, lock_path_for, write_atomic};
use camino::Utf8PathBuf;
use eyre::{Result, ensure};
use fs2::FileExt;
use rstest::rstest;
use std::fs::{File, OpenOptions};
use std::sync::Arc;
use std::time::Duration;

fn hold_lock(target: &Utf8PathBuf) -> Result<File> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(lock_path_for(target))?;
    FileExt::try_lock_exclusive(&file)?;
    Ok(file)
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn write_replaces_content_and_leaves_no_temp_files() -> Result<()> {
    let (_dir, config) = temp_config();
    let target = config.data_dir().join("nested").join("doc.json");
    let policy = WritePolicy {
        attempts: 1,
        backoff: Duration::from_millis(1),
    };

    write_atomic(&target, Arc::from(b"first".as_slice()), policy).await?;
    write_atomic(&target, Arc::from(b"second".as_slice()), policy).await?;

    ensure!(std::fs::read(&target)? == b"second");
    let leftovers: Vec<_> = std::fs::read_dir(config.data_dir().join("nested"))?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.file_name())
        .filter(|name| name.to_string_lossy().starts_with('.'))
        .collect();
    ensure!(leftovers.is_empty(), "unexpected leftovers: {leftovers:?}");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn persistent_contention_fails_after_every_attempt() -> Result<()> {
    let (_dir, config) = temp_config();
    let target = config.data_dir().join("contended.json");
    let _held = hold_lock(&target)?;
    let policy = WritePolicy {
        attempts: 3,
        backoff: Duration::from_millis(5),
    };

    let result = write_atomic(&target, Arc::from(b"data".as_slice()), policy).await;

    ensure!(
        matches!(result, Err(StoreError::LockContention { attempts: 3, .. })),
        "unexpected result {result:?}"
    );
    ensure!(!target.exists());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn transient_contention_is_retried_until_released() -> Result<()> {
    let (_dir, config) = temp_config();
    let target = config.data_dir().join("transient.json");
    let held = hold_lock(&target)?;
    let releaser = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(40)).await;
        FileExt::unlock(&held).expect("lock should release");
    });
    let policy = WritePolicy {
        attempts: 6,
        backoff: Duration::from_millis(20),
    };

    let result = write_atomic(&target, Arc::from(b"data".as_slice()), policy).await;
    releaser.await?;

    ensure!(result.is_ok(), "write should succeed once released: {result:?}");
    ensure!(std::fs::read(&target)? == b"data");
    Ok(())
}

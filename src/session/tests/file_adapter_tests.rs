//! Tests for the file-backed session repository.

use super::{Seed, orchestration};
use crate::ErrorKind;
use crate::session::{
    adapters::file::FileSessionRepository,
    domain::{
        ArtifactKind, MessageRole, Session, SessionState, SessionSummary, ThinkingMetadata,
        ThinkingStepInput,
    },
    ports::{SessionRepository, SessionRepositoryError},
};
use crate::store::{RecordKind, RecoveryMethod, StoreConfig};
use crate::test_support::StepClock;
use camino::Utf8PathBuf;
use eyre::{OptionExt, bail, ensure};
use rstest::{fixture, rstest};
use serde_json::json;
use std::collections::BTreeMap;
use tempfile::TempDir;

#[fixture]
fn data_dir() -> (TempDir, StoreConfig) {
    let dir = tempfile::tempdir().expect("temporary directory should be created");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
        .expect("temporary directory path should be UTF-8");
    (dir, StoreConfig::new(root))
}

fn busy_session() -> eyre::Result<Session> {
    let clock = StepClock::new();
    let mut session = Seed::new(0).build(&orchestration("orch-file"));
    for index in 0..3 {
        session.add_message(
            MessageRole::Assistant,
            format!("message {index}"),
            BTreeMap::new(),
            &clock,
        );
    }
    session.add_artifact(
        "report.md",
        ArtifactKind::Report,
        "long body",
        BTreeMap::new(),
        &clock,
    )?;
    session.add_decision("use sqlite", "single writer", Vec::new(), &clock)?;
    session.set_variable("attempt", json!(2), &clock)?;
    session.update_focus(Some("storage".to_owned()), &clock);
    session.start_thinking(ThinkingMetadata::about("schema"), &clock)?;
    session.add_thinking_step(ThinkingStepInput::new("one table"), &clock)?;
    Ok(session)
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn stored_session_round_trips(data_dir: (TempDir, StoreConfig)) -> eyre::Result<()> {
    let (_guard, config) = data_dir;
    let repository = FileSessionRepository::open(&config).await?;
    let session = busy_session()?;

    repository.store(&session).await?;
    let loaded = repository.find_by_id(session.id()).await?;

    ensure!(loaded.as_ref() == Some(&session));
    ensure!(
        config
            .records_dir(RecordKind::Session)
            .join(format!("{}.json", session.id()))
            .exists()
    );
    let text = tokio::fs::read_to_string(repository.records().path_for(&session.id().to_string())?)
        .await?;
    ensure!(text.contains("\"type\": \"task\""));
    ensure!(text.contains("\"lastActivityAt\""));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn store_rejects_duplicates_and_update_requires_existence(
    data_dir: (TempDir, StoreConfig),
) -> eyre::Result<()> {
    let (_guard, config) = data_dir;
    let repository = FileSessionRepository::open(&config).await?;
    let session = Seed::new(0).build(&orchestration("orch-file"));

    let missing = repository.update(&session).await;
    ensure!(matches!(missing, Err(SessionRepositoryError::NotFound(_))));

    repository.store(&session).await?;
    let duplicate = repository.store(&session).await;
    ensure!(matches!(
        duplicate,
        Err(SessionRepositoryError::DuplicateSession(_))
    ));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn digest_summary_matches_the_full_summary(
    data_dir: (TempDir, StoreConfig),
) -> eyre::Result<()> {
    let (_guard, config) = data_dir;
    let repository = FileSessionRepository::open(&config).await?;
    let session = busy_session()?;
    repository.store(&session).await?;

    let summary = repository
        .find_summary(session.id())
        .await?
        .ok_or_eyre("summary should exist")?;

    ensure!(summary == SessionSummary::from_session(&session));
    ensure!(summary.message_count == 3);
    ensure!(summary.artifact_names == ["report.md"]);
    ensure!(repository.find_summary(crate::session::domain::SessionId::new()).await?.is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn truncated_session_is_reconstructed_suspended(
    data_dir: (TempDir, StoreConfig),
) -> eyre::Result<()> {
    let (_guard, config) = data_dir;
    let repository = FileSessionRepository::open(&config).await?;
    let parent = crate::session::domain::SessionId::new();
    let session = Seed::new(0).under(parent).build(&orchestration("orch-file"));
    repository.store(&session).await?;

    let path = repository.records().path_for(&session.id().to_string())?;
    let text = tokio::fs::read_to_string(&path).await?;
    let Some(prefix) = text.get(..text.len() / 2) else {
        bail!("document should be ASCII");
    };
    tokio::fs::write(&path, prefix).await?;

    let Err(error) = repository.find_by_id(session.id()).await else {
        bail!("truncated document should not load");
    };
    ensure!(error.kind() == ErrorKind::Corrupted);

    let recovered = repository
        .records()
        .recover(&session.id().to_string())
        .await?;
    ensure!(recovered.method == RecoveryMethod::Reconstructed);
    ensure!(recovered.record.id() == session.id());
    ensure!(recovered.record.state() == SessionState::Suspended);
    ensure!(recovered.record.orchestration_id() == session.orchestration_id());
    ensure!(recovered.record.context().messages.is_empty());
    ensure!(recovered.record.shape_violations().is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn listings_filter_by_orchestration(data_dir: (TempDir, StoreConfig)) -> eyre::Result<()> {
    let (_guard, config) = data_dir;
    let repository = FileSessionRepository::open(&config).await?;
    let ours = orchestration("orch-ours");
    let first = Seed::new(0).build(&ours);
    let second = Seed::new(1).build(&ours);
    let foreign = Seed::new(2).build(&orchestration("orch-theirs"));
    for session in [&first, &second, &foreign] {
        repository.store(session).await?;
    }

    let scoped = repository.find_by_orchestration(&ours).await?;
    let everything = repository.list_all().await?;

    ensure!(scoped.len() == 2);
    ensure!(scoped.iter().all(|session| session.orchestration_id() == &ours));
    ensure!(everything.len() == 3);

    let removal = repository.remove(first.id()).await?;
    ensure!(removal.existed);
    ensure!(repository.find_by_id(first.id()).await?.is_none());
    Ok(())
}

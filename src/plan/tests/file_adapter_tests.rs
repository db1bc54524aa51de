//! Tests for the file-backed plan repository.

use super::orchestration;
use crate::plan::{
    adapters::file::FilePlanRepository,
    domain::{NewPlan, Plan},
    ports::PlanRepository,
};
use crate::store::{RecordKind, RecoveryMethod, StoreConfig};
use crate::task::domain::TaskId;
use crate::test_support::StepClock;
use camino::Utf8PathBuf;
use eyre::{bail, ensure};
use rstest::{fixture, rstest};
use tempfile::TempDir;

#[fixture]
fn data_dir() -> (TempDir, StoreConfig) {
    let dir = tempfile::tempdir().expect("temporary directory should be created");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
        .expect("temporary directory path should be UTF-8");
    (dir, StoreConfig::new(root))
}

fn sample_plan() -> Plan {
    Plan::new(
        NewPlan {
            orchestration_id: orchestration("orch-file"),
            title: "Release 2".to_owned(),
            summary: "Ship the importer".to_owned(),
            requirements: vec!["import csv".to_owned(), "report errors".to_owned()],
            task_ids: vec![TaskId::new(), TaskId::new()],
        },
        &StepClock::new(),
    )
    .expect("plan should be valid")
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn saved_plan_round_trips_and_overwrites(
    data_dir: (TempDir, StoreConfig),
) -> eyre::Result<()> {
    let (_guard, config) = data_dir;
    let repository = FilePlanRepository::open(&config).await?;
    let mut plan = sample_plan();

    repository.save(&plan).await?;
    ensure!(repository.find_by_id(plan.id()).await?.as_ref() == Some(&plan));
    ensure!(
        config
            .records_dir(RecordKind::Plan)
            .join(format!("{}.json", plan.id()))
            .exists()
    );

    plan.attach_tasks(&[TaskId::new()], &StepClock::new());
    repository.save(&plan).await?;
    let reloaded = repository.find_by_id(plan.id()).await?;
    ensure!(reloaded.map(|stored| stored.task_ids().len()) == Some(3));

    let text = tokio::fs::read_to_string(repository.records().path_for(&plan.id().to_string())?)
        .await?;
    ensure!(text.contains("\"taskIds\""));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn truncated_plan_keeps_its_identity(data_dir: (TempDir, StoreConfig)) -> eyre::Result<()> {
    let (_guard, config) = data_dir;
    let repository = FilePlanRepository::open(&config).await?;
    let plan = sample_plan();
    repository.save(&plan).await?;

    let path = repository.records().path_for(&plan.id().to_string())?;
    let text = tokio::fs::read_to_string(&path).await?;
    let Some(prefix) = text.get(..text.len() / 2) else {
        bail!("document should be ASCII");
    };
    tokio::fs::write(&path, prefix).await?;

    let recovered = repository.records().recover(&plan.id().to_string()).await?;

    ensure!(recovered.method == RecoveryMethod::Reconstructed);
    ensure!(recovered.record.id() == plan.id());
    ensure!(recovered.record.orchestration_id() == plan.orchestration_id());
    ensure!(recovered.record.shape_violations().is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn removal_is_scoped_and_idempotent(data_dir: (TempDir, StoreConfig)) -> eyre::Result<()> {
    let (_guard, config) = data_dir;
    let repository = FilePlanRepository::open(&config).await?;
    let plan = sample_plan();
    repository.save(&plan).await?;

    ensure!(
        repository
            .find_by_orchestration(&orchestration("orch-file"))
            .await?
            .len()
            == 1
    );
    ensure!(repository.remove(plan.id()).await?.existed);
    ensure!(!repository.remove(plan.id()).await?.existed);
    ensure!(repository.find_by_id(plan.id()).await?.is_none());
    Ok(())
}

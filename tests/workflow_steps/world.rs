//! Shared world state for workflow engine BDD scenarios.

use std::collections::HashMap;

use atelier::OrchestrationId;
use atelier::engine::Engine;
use atelier::session::domain::{RelatedSessions, Session};
use atelier::store::{RecordStore, Recovered, StoreConfig};
use atelier::task::domain::{DependencyValidation, Task};
use atelier::ErrorKind;
use camino::Utf8PathBuf;
use rstest::fixture;
use tempfile::TempDir;

/// Scenario world backed by a temporary data directory.
pub struct WorkflowWorld {
    pub data_dir: TempDir,
    pub config: StoreConfig,
    pub orchestration_id: OrchestrationId,
    pub engine: Option<Engine>,
    pub tasks: HashMap<String, Task>,
    pub sessions: HashMap<String, Session>,
    pub next_task: Option<Option<Task>>,
    pub validation: Option<DependencyValidation>,
    pub load_error: Option<ErrorKind>,
    pub recovered: Option<Recovered<Task>>,
    pub related: Option<RelatedSessions>,
}

impl WorkflowWorld {
    /// Creates a world rooted in a fresh temporary directory.
    #[must_use]
    pub fn new() -> Self {
        let data_dir = tempfile::tempdir().expect("temporary directory should be created");
        let root = Utf8PathBuf::from_path_buf(data_dir.path().to_path_buf())
            .expect("temporary directory path should be UTF-8");
        Self {
            data_dir,
            config: StoreConfig::new(root),
            orchestration_id: OrchestrationId::new("orch-bdd")
                .expect("orchestration identifier should be valid"),
            engine: None,
            tasks: HashMap::new(),
            sessions: HashMap::new(),
            next_task: None,
            validation: None,
            load_error: None,
            recovered: None,
            related: None,
        }
    }

    /// Returns the opened engine.
    pub fn engine(&self) -> Result<&Engine, eyre::Report> {
        self.engine
            .as_ref()
            .ok_or_else(|| eyre::eyre!("workflow store has not been opened"))
    }

    /// Returns a task created earlier in the scenario.
    pub fn task(&self, label: &str) -> Result<&Task, eyre::Report> {
        self.tasks
            .get(label)
            .ok_or_else(|| eyre::eyre!("no task labelled {label} in scenario world"))
    }

    /// Returns a session created earlier in the scenario.
    pub fn session(&self, label: &str) -> Result<&Session, eyre::Report> {
        self.sessions
            .get(label)
            .ok_or_else(|| eyre::eyre!("no session labelled {label} in scenario world"))
    }

    /// Returns the engine's task record store for direct file access.
    pub fn task_records(&self) -> Result<&RecordStore<Task>, eyre::Report> {
        Ok(self.engine()?.task_records())
    }
}

impl Default for WorkflowWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> WorkflowWorld {
    WorkflowWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

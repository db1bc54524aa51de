//! File-backed assembly of the task, session and plan services.
//!
//! An [`Engine`] opens one record store per kind under a shared data
//! directory and hands out services that share a single clock. Recovery
//! and backup operations go through [`Engine::task_records`] and its
//! siblings so they see the same cache as the services.
//!
//! ```no_run
//! use atelier::OrchestrationId;
//! use atelier::engine::Engine;
//! use atelier::store::StoreConfig;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Engine::open(StoreConfig::from_env()?).await?;
//! let orchestration_id = OrchestrationId::new("orch-1")?;
//! if let Some(task) = engine.tasks().get_next_task(&orchestration_id).await? {
//!     println!("next: {}", task.name());
//! }
//! # Ok(())
//! # }
//! ```

use crate::OrchestrationId;
use crate::error::ErrorKind;
use crate::plan::{
    adapters::file::FilePlanRepository,
    domain::Plan,
    services::{PlanService, PlanServiceError},
};
use crate::session::{
    adapters::file::FileSessionRepository,
    domain::Session,
    services::{SessionService, SessionServiceError},
};
use crate::store::{BulkOutcome, ConfigError, RecordStore, StoreConfig, StoreError};
use crate::task::{
    adapters::file::FileTaskRepository,
    domain::Task,
    services::{TaskGraphError, TaskGraphService},
};
use mockable::{Clock, DefaultClock};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Errors raised while opening or driving an engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The environment held an invalid setting.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A record directory could not be opened.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A task operation failed.
    #[error(transparent)]
    Task(#[from] TaskGraphError),

    /// A session operation failed.
    #[error(transparent)]
    Session(#[from] SessionServiceError),

    /// A plan operation failed.
    #[error(transparent)]
    Plan(#[from] PlanServiceError),
}

impl EngineError {
    /// Classifies the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::ValidationFailed,
            Self::Store(error) => error.kind(),
            Self::Task(error) => error.kind(),
            Self::Session(error) => error.kind(),
            Self::Plan(error) => error.kind(),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Task graph service over the file store.
pub type FileTaskService<C> = TaskGraphService<FileTaskRepository, C>;
/// Session service over the file store.
pub type FileSessionService<C> = SessionService<FileSessionRepository, C>;
/// Plan service over the file store.
pub type FilePlanService<C> = PlanService<FilePlanRepository, C>;

/// Services sharing one data directory and one clock.
pub struct Engine<C = DefaultClock>
where
    C: Clock + Send + Sync + 'static,
{
    config: StoreConfig,
    task_files: Arc<FileTaskRepository>,
    session_files: Arc<FileSessionRepository>,
    plan_files: Arc<FilePlanRepository>,
    tasks: FileTaskService<C>,
    sessions: FileSessionService<C>,
    plans: FilePlanService<C>,
}

impl Engine<DefaultClock> {
    /// Opens the stores under `config` with the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Store`] when a record directory cannot be
    /// created.
    pub async fn open(config: StoreConfig) -> EngineResult<Self> {
        Self::open_with_clock(config, Arc::new(DefaultClock)).await
    }
}

impl<C> Engine<C>
where
    C: Clock + Send + Sync + 'static,
{
    /// Opens the stores under `config` with an injected clock, shared by
    /// the services and the record stores.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Store`] when a record directory cannot be
    /// created.
    pub async fn open_with_clock(config: StoreConfig, clock: Arc<C>) -> EngineResult<Self> {
        let store_clock: Arc<dyn Clock + Send + Sync> = clock.clone();
        let task_files =
            Arc::new(FileTaskRepository::open_with_clock(&config, Arc::clone(&store_clock)).await?);
        let session_files = Arc::new(
            FileSessionRepository::open_with_clock(&config, Arc::clone(&store_clock)).await?,
        );
        let plan_files = Arc::new(FilePlanRepository::open_with_clock(&config, store_clock).await?);
        info!(
            data_dir = %config.data_dir(),
            backups = config.backups_enabled(),
            cache = config.cache_enabled(),
            "engine opened"
        );
        Ok(Self {
            tasks: TaskGraphService::new(Arc::clone(&task_files), Arc::clone(&clock)),
            sessions: SessionService::new(Arc::clone(&session_files), Arc::clone(&clock)),
            plans: PlanService::new(Arc::clone(&plan_files), clock),
            task_files,
            session_files,
            plan_files,
            config,
        })
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns the task graph service.
    #[must_use]
    pub const fn tasks(&self) -> &FileTaskService<C> {
        &self.tasks
    }

    /// Returns the session service.
    #[must_use]
    pub const fn sessions(&self) -> &FileSessionService<C> {
        &self.sessions
    }

    /// Returns the plan service.
    #[must_use]
    pub const fn plans(&self) -> &FilePlanService<C> {
        &self.plans
    }

    /// Returns the task record store behind [`Engine::tasks`].
    #[must_use]
    pub fn task_records(&self) -> &RecordStore<Task> {
        self.task_files.records()
    }

    /// Returns the session record store behind [`Engine::sessions`].
    #[must_use]
    pub fn session_records(&self) -> &RecordStore<Session> {
        self.session_files.records()
    }

    /// Returns the plan record store behind [`Engine::plans`].
    #[must_use]
    pub fn plan_records(&self) -> &RecordStore<Plan> {
        self.plan_files.records()
    }

    /// Removes every task and plan of an orchestration, backing each one up
    /// first when backups are enabled. Sessions are kept.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Task`] or [`EngineError::Plan`] when a scan
    /// fails. Individual removal failures are reported in the outcome.
    pub async fn reset_orchestration(
        &self,
        orchestration_id: &OrchestrationId,
    ) -> EngineResult<BulkOutcome> {
        let mut outcome = self.tasks.reset_orchestration(orchestration_id).await?;
        outcome.merge(self.plans.reset_orchestration(orchestration_id).await?);
        Ok(outcome)
    }
}

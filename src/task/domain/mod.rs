//! Domain model for the task graph.
//!
//! Tasks, their typed dependency edges, the status state machine and the
//! graph algorithms run over one orchestration's tasks. Nothing here performs
//! I/O.

mod dependency;
mod error;
mod graph;
mod ids;
mod statistics;
mod status;
mod task;

pub use dependency::{Dependency, DependencyCheck, DependencyType, UnsatisfiedDependency};
pub use error::{
    ParseDependencyTypeError, ParseTaskPriorityError, ParseTaskStatusError, TaskDomainError,
};
pub use graph::{
    DependencyEdge, DependencyGraph, DependencyLevels, DependencyValidation, ExecutionOrder,
    InvalidDependency,
};
pub use ids::TaskId;
pub use statistics::TaskStatistics;
pub use status::{TaskPriority, TaskStatus};
pub use task::{AcceptanceCriterion, Estimation, NewTask, PersistedTaskData, Task, TaskProgress};

//! Application services for the task graph.

mod lifecycle;
mod scheduling;

pub use lifecycle::{
    CreateTaskRequest, TaskGraphError, TaskGraphResult, TaskGraphService, UpdateTaskRequest,
};

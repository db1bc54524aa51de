//! Application services for the session hierarchy.

mod context;
mod hierarchy;
mod lifecycle;
mod maintenance;

pub use context::{ArtifactInput, DecisionInput};
pub use lifecycle::{
    CreateSessionRequest, SessionService, SessionServiceError, SessionServiceResult,
};

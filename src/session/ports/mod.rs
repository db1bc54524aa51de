//! Port contracts for session persistence.

pub mod repository;

#[cfg(test)]
pub use repository::MockSessionRepository;
pub use repository::{SessionRepository, SessionRepositoryError, SessionRepositoryResult};

//! Port contracts for plan persistence.

pub mod repository;

pub use repository::{PlanRepository, PlanRepositoryError, PlanRepositoryResult};

//! In-memory plan adapter for unit tests.

mod plan;

pub use plan::InMemoryPlanRepository;

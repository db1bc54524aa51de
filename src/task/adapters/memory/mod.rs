//! In-memory task adapter for unit tests.

mod task;

pub use task::InMemoryTaskRepository;

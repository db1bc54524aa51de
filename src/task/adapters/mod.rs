//! Adapter implementations for the task repository port.
//!
//! - [`memory::InMemoryTaskRepository`]: thread-safe storage for unit tests
//! - [`file::FileTaskRepository`]: durable storage on the record store

pub mod file;
pub mod memory;

//! Adapter implementations for the session repository port.
//!
//! - [`memory::InMemorySessionRepository`]: thread-safe storage for unit tests
//! - [`file::FileSessionRepository`]: durable storage on the record store

pub mod file;
pub mod memory;

//! Atelier: durable task-graph and session engine for multi-phase
//! development workflows.
//!
//! A workflow instance is an *orchestration*. Its planning phase produces a
//! [`plan`] and a graph of [`task`] records; every phase runs inside a
//! [`session`] that accumulates messages, artifacts, decisions and reasoning
//! traces. All records are JSON documents written atomically by the
//! [`store`], which also keeps backups and recovers damaged files.
//!
//! # Architecture
//!
//! Each component follows hexagonal architecture principles:
//!
//! - **Domain**: pure types and rules with no I/O
//! - **Ports**: async repository traits
//! - **Adapters**: in-memory implementations for tests and file-backed
//!   implementations over the record store
//! - **Services**: orchestration generic over a repository and a
//!   [`mockable::Clock`]
//!
//! [`engine::Engine`] wires the file-backed services together for a host.
//!
//! # Modules
//!
//! - [`task`]: dependency graph, cycle detection, levelling and scheduling
//! - [`session`]: session state machine, context and hierarchy navigation
//! - [`plan`]: planning phase output
//! - [`store`]: atomic persistence, backups and recovery
//! - [`engine`]: file-backed assembly of the services

pub mod engine;
pub mod error;
pub mod orchestration;
pub mod plan;
pub mod session;
pub mod store;
pub mod task;

#[cfg(test)]
mod test_support;

pub use error::ErrorKind;
pub use orchestration::{EmptyOrchestrationId, OrchestrationId};

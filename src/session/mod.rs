//! Session hierarchy and lifecycle state machine.
//!
//! A session is one bounded execution context (planning, task execution,
//! verification or interactive work) inside an orchestration. Sessions
//! accumulate messages, artifacts, decisions and an optional reasoning
//! trace, and nest into parent/child trees. The module follows hexagonal
//! architecture:
//!
//! - Domain types, the state machine and the hierarchy index in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;

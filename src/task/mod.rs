//! Task graph for one or more orchestrations.
//!
//! Tasks carry a status state machine, a priority, acceptance criteria and
//! typed dependencies on other tasks of the same orchestration. The graph
//! service detects cycles, levels the graph, orders execution and picks the
//! next task to run. The module follows hexagonal architecture:
//!
//! - Domain types and graph algorithms in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;

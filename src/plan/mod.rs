//! Plan records produced by the planning phase.
//!
//! A plan ties an orchestration's requirements to the ordered tasks created
//! for them. The module follows the same layout as [`crate::task`]:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;

//! Adapter implementations of the plan repository port.

pub mod file;
pub mod memory;

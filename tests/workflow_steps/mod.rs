//! Step definitions for workflow engine BDD scenarios.

pub mod given;
pub mod then;
pub mod when;
pub mod world;

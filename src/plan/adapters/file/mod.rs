//! File-backed plan adapter.

mod plan;
mod record;

pub use plan::FilePlanRepository;

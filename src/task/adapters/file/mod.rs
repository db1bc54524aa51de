//! File-backed task adapter.

mod record;
mod task;

pub use task::FileTaskRepository;

//! File-backed session adapter.

mod digest;
mod record;
mod session;

pub use session::FileSessionRepository;

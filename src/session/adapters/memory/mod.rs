//! In-memory session adapter for unit tests.

mod session;

pub use session::InMemorySessionRepository;

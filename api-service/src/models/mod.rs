//! Domain models for the API service.

pub mod session;

pub use session::{MessageRole, Session, SessionExchange, SessionMessage, SessionUpdate};

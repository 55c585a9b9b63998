//! In-memory state kept between requests
//!
//! - Conversation history per caller-supplied session id

mod sessions;

pub use sessions::{SessionError, SessionGuard, SessionStore};

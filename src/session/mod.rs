//! Sessions and session-backed identity resolution.

mod config;
mod in_memory;
mod resolver;

pub use config::SessionConfig;
pub use in_memory::InMemorySessionStore;
pub use resolver::SessionIdentityResolver;

pub use crate::traits::session::{SessionData, SessionStore};

//! Trait definitions for swappable collaborators
//!
//! Session storage and outbound email are provided by the host; the crate
//! ships simple implementations of both.

pub mod mailer;
pub mod session;

//! Moodle web-service integration.
//!
//! `gateway` issues the authenticated HTTP calls, `records` holds the
//! function-specific payload shapes, and `shape` turns raw payloads into
//! the values the tools return.

mod gateway;
pub mod records;
pub mod shape;

pub use gateway::MoodleGateway;

//! Data models for the Mynofi updater.
//!
//! These models match the JSON shapes produced by the `check-update` edge function
//! and the real-time socket.

mod realtime;
mod version;

pub use realtime::*;
pub use version::*;

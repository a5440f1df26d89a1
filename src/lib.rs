//! Gag Relay: forwards shared posts from a bot chat to subscriber groups.

pub mod admin;
pub mod channels;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod pipeline;
pub mod store;
pub mod watch;

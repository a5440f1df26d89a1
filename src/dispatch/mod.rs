//! Outbound side: recipient resolution and delivery.

pub mod fanout;

pub use fanout::{DispatchReport, Fanout};

//! Chat platform access.

pub mod telegram;
pub mod telegram_types;

pub use telegram::{BotApi, DEFAULT_API_BASE, build_http_client};
pub use telegram_types::{Update, UpdateEnvelope};

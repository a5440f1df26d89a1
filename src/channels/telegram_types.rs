//! Bot API wire types for the `getUpdates` envelope.

use serde::Deserialize;

/// `{ "ok": bool, "result": [Update] }`
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateEnvelope {
    pub ok: bool,
    #[serde(default)]
    pub result: Vec<Update>,
}

/// One inbound event. `update_id` is strictly increasing.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<BotMessage>,
    pub channel_post: Option<ChannelPost>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotMessage {
    pub message_id: i64,
    pub from: Option<FromInfo>,
    pub chat: Option<ChatInfo>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelPost {
    pub message_id: i64,
    pub chat: Option<ChatInfo>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FromInfo {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatInfo {
    pub id: i64,
    pub title: Option<String>,
}

impl Update {
    /// Message text, falling back to the channel post text.
    pub fn text(&self) -> Option<&str> {
        self.message
            .as_ref()
            .and_then(|m| m.text.as_deref())
            .or_else(|| self.channel_post.as_ref().and_then(|p| p.text.as_deref()))
    }

    /// Numeric id of the sender, when the update is a direct/group message.
    pub fn sender_id(&self) -> Option<i64> {
        self.message
            .as_ref()
            .and_then(|m| m.from.as_ref())
            .map(|f| f.id)
    }
}

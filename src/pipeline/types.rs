//! Shared types for the classify → resolve → deliver pipeline.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

// ── Category ────────────────────────────────────────────────────────

/// Audience tag attached to a shared post; selects recipient groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Beefy,
    Meaty,
    Veggie,
}

impl Category {
    /// Normalized label, as stored in the recipient directory.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Beefy => "beefy",
            Category::Meaty => "meaty",
            Category::Veggie => "veggie",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    /// Accepts both the hashtag form (`#beefy`) and the bare label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim().trim_start_matches('#');
        match label.to_ascii_lowercase().as_str() {
            "beefy" => Ok(Category::Beefy),
            "meaty" => Ok(Category::Meaty),
            "veggie" => Ok(Category::Veggie),
            _ => Err(format!("unknown category: {s}")),
        }
    }
}

// ── Media ───────────────────────────────────────────────────────────

/// What a dispatch unit carries. Exactly one locator per unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Media {
    Text(String),
    Photo(String),
    Video(String),
    Animation(String),
}

/// Discriminant of [`Media`], useful for logging and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Text,
    Photo,
    Video,
    Animation,
}

impl Media {
    pub fn kind(&self) -> MediaKind {
        match self {
            Media::Text(_) => MediaKind::Text,
            Media::Photo(_) => MediaKind::Photo,
            Media::Video(_) => MediaKind::Video,
            Media::Animation(_) => MediaKind::Animation,
        }
    }

    /// The text body or media URL.
    pub fn locator(&self) -> &str {
        match self {
            Media::Text(s) | Media::Photo(s) | Media::Video(s) | Media::Animation(s) => s,
        }
    }

    /// Bot API method that delivers this kind of content.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Media::Text(_) => "sendMessage",
            Media::Photo(_) => "sendPhoto",
            Media::Video(_) => "sendVideo",
            Media::Animation(_) => "sendAnimation",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MediaKind::Text => "text",
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
            MediaKind::Animation => "animation",
        };
        f.write_str(s)
    }
}

// ── Dispatch unit ───────────────────────────────────────────────────

/// A classified message ready for recipient resolution.
///
/// `recipient` is unset when the classifier creates the unit; the fan-out
/// produces one copy per resolved recipient with it filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchUnit {
    pub category: Category,
    pub media: Media,
    pub caption: Option<String>,
    pub recipient: Option<i64>,
}

impl DispatchUnit {
    pub fn new(category: Category, media: Media) -> Self {
        Self {
            category,
            media,
            caption: None,
            recipient: None,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        let caption = caption.into();
        self.caption = if caption.trim().is_empty() {
            None
        } else {
            Some(caption)
        };
        self
    }

    /// Delivery copy addressed to a single chat.
    pub fn for_recipient(&self, chat_id: i64) -> Self {
        Self {
            recipient: Some(chat_id),
            ..self.clone()
        }
    }

    /// JSON body for the Bot API send call, if a recipient has been attached.
    pub fn payload(&self) -> Option<DeliveryPayload<'_>> {
        Some(DeliveryPayload {
            content: &self.media,
            caption: self.caption.as_deref().unwrap_or_default(),
            chat_id: self.recipient?,
        })
    }
}

/// Serialized form of a delivery: `{"<kind>": locator, "caption": .., "chat_id": ..}`.
#[derive(Debug, Serialize)]
pub struct DeliveryPayload<'a> {
    #[serde(flatten)]
    pub content: &'a Media,
    pub caption: &'a str,
    pub chat_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parses_hashtag_and_bare_forms() {
        assert_eq!("#beefy".parse::<Category>().unwrap(), Category::Beefy);
        assert_eq!("meaty".parse::<Category>().unwrap(), Category::Meaty);
        assert_eq!(" #Veggie ".parse::<Category>().unwrap(), Category::Veggie);
        assert!("#spicy".parse::<Category>().is_err());
    }

    #[test]
    fn endpoint_follows_media_kind() {
        assert_eq!(Media::Text("hi".into()).endpoint(), "sendMessage");
        assert_eq!(Media::Photo("p".into()).endpoint(), "sendPhoto");
        assert_eq!(Media::Video("v".into()).endpoint(), "sendVideo");
        assert_eq!(Media::Animation("a".into()).endpoint(), "sendAnimation");
    }

    #[test]
    fn blank_caption_is_dropped() {
        let unit = DispatchUnit::new(Category::Beefy, Media::Photo("x".into())).with_caption("  ");
        assert_eq!(unit.caption, None);
    }

    #[test]
    fn recipient_copy_leaves_original_untouched() {
        let unit = DispatchUnit::new(Category::Meaty, Media::Video("v.mp4".into()));
        let copy = unit.for_recipient(-100123);
        assert_eq!(unit.recipient, None);
        assert_eq!(copy.recipient, Some(-100123));
        assert_eq!(copy.media, unit.media);
    }

    #[test]
    fn payload_requires_recipient() {
        let unit = DispatchUnit::new(Category::Meaty, Media::Video("v.mp4".into()));
        assert!(unit.payload().is_none());
    }

    #[test]
    fn payload_carries_single_locator_field() {
        let unit = DispatchUnit::new(
            Category::Beefy,
            Media::Animation("https://host/a_460sv.gif".into()),
        )
        .with_caption("so good")
        .for_recipient(42);

        let json = serde_json::to_value(unit.payload().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "animation": "https://host/a_460sv.gif",
                "caption": "so good",
                "chat_id": 42
            })
        );
    }

    #[test]
    fn payload_caption_defaults_to_empty() {
        let unit = DispatchUnit::new(Category::Veggie, Media::Photo("p.jpg".into())).for_recipient(7);
        let json = serde_json::to_value(unit.payload().unwrap()).unwrap();
        assert_eq!(json["caption"], "");
        assert_eq!(json["photo"], "p.jpg");
        assert!(json.get("video").is_none());
    }
}

//! Share-text recognition.
//!
//! Two inputs are accepted, both ending in a category hashtag and an
//! optional caption:
//! - web share: a direct media URL on the image cache,
//!   e.g. `https://img-9gag-fun.9cache.com/photo/abc123_460sv.mp4 #beefy lol`
//! - app share: a post link carrying only the item id,
//!   e.g. `https://9gag.com/gag/abc123?utm_source=copy_link&utm_medium=post_share #beefy lol`
//!
//! Both converge to a [`ShareLink`] holding the same URL stem, from which
//! the probe derives the final media locator.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::ClassifyError;
use crate::pipeline::types::Category;

/// Media cache prefix every URL stem starts with.
pub const MEDIA_HOST: &str = "https://img-9gag-fun.9cache.com/photo/";

static WEB_SHARE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<url>https://img-9gag-fun\.9cache\.com/photo/(?P<itemid>[a-zA-Z0-9]*)_460)(?P<code>swp|svvp9|svav1|sv)\.(?P<extn>webm|mp4|webp)\s(?P<category>#veggie|#meaty|#beefy)\s?(?P<caption>[\w\W\s\d]+)?$",
    )
    .expect("web share pattern is valid")
});

static APP_SHARE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https://9gag\.com/gag/(?P<itemid>[a-zA-Z0-9]*)\?utm_source=copy_link&utm_medium=post_share\s(?P<category>#veggie|#meaty|#beefy)\s?(?P<caption>[\w\W\s\d]+)?$",
    )
    .expect("app share pattern is valid")
});

/// Structured fields pulled out of a share message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    pub item_id: String,
    pub category: Category,
    pub caption: Option<String>,
    /// Media URL without variant suffix, e.g. `.../photo/abc123_460`.
    pub url_stem: String,
}

/// Expand an item id into the cache URL stem used by web shares.
pub fn url_stem_for(item_id: &str) -> String {
    format!("{MEDIA_HOST}{item_id}_460")
}

/// Match `text` against the web-share pattern, then the app-share pattern.
pub fn parse_share(text: &str) -> Result<ShareLink, ClassifyError> {
    if let Some(caps) = WEB_SHARE.captures(text) {
        let item_id = group(&caps, "itemid").unwrap_or_default().to_string();
        let url_stem = group(&caps, "url").unwrap_or_default().to_string();
        return share_link(&caps, item_id, url_stem, text);
    }

    if let Some(caps) = APP_SHARE.captures(text) {
        let item_id = group(&caps, "itemid").unwrap_or_default().to_string();
        let url_stem = url_stem_for(&item_id);
        return share_link(&caps, item_id, url_stem, text);
    }

    Err(ClassifyError::UnrecognizedText(text.to_string()))
}

fn share_link(
    caps: &Captures<'_>,
    item_id: String,
    url_stem: String,
    text: &str,
) -> Result<ShareLink, ClassifyError> {
    let category = group(caps, "category")
        .and_then(|c| c.parse::<Category>().ok())
        .ok_or_else(|| ClassifyError::UnrecognizedText(text.to_string()))?;

    let caption = group(caps, "caption")
        .filter(|c| !c.trim().is_empty())
        .map(String::from);

    Ok(ShareLink {
        item_id,
        category,
        caption,
        url_stem,
    })
}

fn group<'t>(caps: &Captures<'t>, name: &str) -> Option<&'t str> {
    caps.name(name).map(|m| m.as_str())
}

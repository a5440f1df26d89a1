//! Media-kind resolution by trial request.
//!
//! The media cache has no metadata endpoint, so the kind is inferred from
//! a GET on the video variant of the URL stem:
//!
//! | status | content length | result |
//! |--------|----------------|--------|
//! | 200    | ≥ 99 999       | video, `{stem}sv.mp4` |
//! | 200    | < 99 999       | animation, `{stem}sv.gif` |
//! | 404    | any            | photo, `{stem}s.jpg` |
//! | other  | any            | error |
//!
//! Suffixes must stay byte-for-byte; the Bot API fetches these URLs as-is.

use std::time::Duration;

use reqwest::StatusCode;
use tracing::debug;

use crate::error::ClassifyError;
use crate::pipeline::types::Media;

/// Smallest body (bytes) still considered a real video rather than a gif clip.
pub const VIDEO_MIN_BYTES: u64 = 99_999;

pub const VIDEO_SUFFIX: &str = "sv.mp4";
pub const ANIMATION_SUFFIX: &str = "sv.gif";
pub const PHOTO_SUFFIX: &str = "s.jpg";

/// Issues the trial request against the media cache.
#[derive(Clone)]
pub struct MediaProbe {
    client: reqwest::Client,
    timeout: Option<Duration>,
}

impl MediaProbe {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: None,
        }
    }

    /// Override the client's request timeout for probe calls.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Resolve the media behind `stem` (e.g. `https://.../photo/abc_460`).
    pub async fn resolve(&self, stem: &str) -> Result<Media, ClassifyError> {
        let url = format!("{stem}{VIDEO_SUFFIX}");
        let mut req = self.client.get(&url);
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| ClassifyError::MediaUndetermined {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        let content_length = resp.content_length();
        debug!(%url, %status, ?content_length, "Media probe answered");

        media_from_probe(status, content_length, stem)
    }
}

/// Map a probe outcome to a media locator. An unknown length counts as zero.
pub fn media_from_probe(
    status: StatusCode,
    content_length: Option<u64>,
    stem: &str,
) -> Result<Media, ClassifyError> {
    match status {
        StatusCode::OK if content_length.unwrap_or(0) >= VIDEO_MIN_BYTES => {
            Ok(Media::Video(format!("{stem}{VIDEO_SUFFIX}")))
        }
        StatusCode::OK => Ok(Media::Animation(format!("{stem}{ANIMATION_SUFFIX}"))),
        StatusCode::NOT_FOUND => Ok(Media::Photo(format!("{stem}{PHOTO_SUFFIX}"))),
        other => Err(ClassifyError::MediaUndetermined {
            url: format!("{stem}{VIDEO_SUFFIX}"),
            reason: format!("unexpected probe status {other}"),
        }),
    }
}

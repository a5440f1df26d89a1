//! Message classification: raw text in, dispatch unit out.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::ClassifyError;
use crate::pipeline::patterns::{MEDIA_HOST, parse_share};
use crate::pipeline::probe::MediaProbe;
use crate::pipeline::types::DispatchUnit;

/// Turns inbound message text into a [`DispatchUnit`].
///
/// The watcher holds one of these behind an `Arc` and calls it once per
/// inbound update.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<DispatchUnit, ClassifyError>;
}

/// Classifier for shared posts: pattern match, then probe the media cache.
pub struct ShareClassifier {
    probe: MediaProbe,
    media_host: String,
}

impl ShareClassifier {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            probe: MediaProbe::new(client),
            media_host: MEDIA_HOST.to_string(),
        }
    }

    /// Probe media under `host` instead of the public cache. `host` takes
    /// the place of [`MEDIA_HOST`] at the front of every URL stem.
    pub fn with_media_host(mut self, host: impl Into<String>) -> Self {
        self.media_host = host.into();
        self
    }

    fn stem_on_host(&self, url_stem: &str) -> String {
        match url_stem.strip_prefix(MEDIA_HOST) {
            Some(rest) => format!("{}{rest}", self.media_host),
            None => url_stem.to_string(),
        }
    }

    /// Bound each media probe by `timeout` instead of the client default.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe = self.probe.with_timeout(timeout);
        self
    }
}

#[async_trait]
impl Classifier for ShareClassifier {
    async fn classify(&self, text: &str) -> Result<DispatchUnit, ClassifyError> {
        let link = parse_share(text)?;
        let media = self.probe.resolve(&self.stem_on_host(&link.url_stem)).await?;
        debug!(
            item_id = %link.item_id,
            category = %link.category,
            kind = %media.kind(),
            "Classified share"
        );

        let unit = DispatchUnit::new(link.category, media);
        Ok(match link.caption {
            Some(caption) => unit.with_caption(caption),
            None => unit,
        })
    }
}

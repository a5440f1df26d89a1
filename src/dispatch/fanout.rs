//! Dispatch fan-out. Resolves recipients per unit and delivers to each
//! of them concurrently.
//!
//! Per unit: pick the Bot API method from the media kind, resolve the
//! category, then POST one copy per recipient. A failed recipient is logged
//! and skipped; it never affects its siblings. In-flight deliveries are
//! capped by a semaphore shared across all units.

use std::sync::Arc;

use reqwest::StatusCode;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::channels::BotApi;
use crate::error::{DeliveryError, DirectoryError};
use crate::pipeline::DispatchUnit;
use crate::store::RecipientDirectory;
use crate::watch::DispatchBatch;

/// Outcome counts for one dispatch unit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Consumer side of the watcher channel.
#[derive(Clone)]
pub struct Fanout {
    api: BotApi,
    directory: Arc<dyn RecipientDirectory>,
    limiter: Arc<Semaphore>,
}

impl Fanout {
    /// `max_concurrent_deliveries` bounds in-flight POSTs; zero is treated as one.
    pub fn new(
        api: BotApi,
        directory: Arc<dyn RecipientDirectory>,
        max_concurrent_deliveries: usize,
    ) -> Self {
        Self {
            api,
            directory,
            limiter: Arc::new(Semaphore::new(max_concurrent_deliveries.max(1))),
        }
    }

    pub fn spawn(self, rx: mpsc::Receiver<DispatchBatch>) -> JoinHandle<()> {
        tokio::spawn(self.run(rx))
    }

    /// Drain batches until the watcher closes the channel.
    ///
    /// Units are dispatched on their own tasks; the loop never waits for
    /// deliveries before taking the next batch.
    pub async fn run(self, mut rx: mpsc::Receiver<DispatchBatch>) {
        info!("Fan-out waiting for batches");

        while let Some(batch) = rx.recv().await {
            debug!(units = batch.len(), "Batch received");
            for unit in batch {
                let fanout = self.clone();
                tokio::spawn(async move {
                    fanout.dispatch_unit(unit).await;
                });
            }
        }

        info!("Dispatch channel closed, fan-out stopping");
    }

    /// Resolve recipients for `unit` and deliver a copy to each.
    ///
    /// Waits for this unit's deliveries and reports the counts.
    pub async fn dispatch_unit(&self, unit: DispatchUnit) -> DispatchReport {
        let kind = unit.media.kind();
        if unit.media.locator().is_empty() {
            error!(category = %unit.category, %kind, "Dispatch unit has no content, skipping");
            return DispatchReport::default();
        }

        let recipients = match self.directory.resolve(unit.category).await {
            Ok(recipients) if !recipients.is_empty() => recipients,
            Ok(_) | Err(DirectoryError::NotFound { .. }) => {
                warn!(category = %unit.category, "No recipients for category, dropping unit");
                return DispatchReport::default();
            }
            Err(e) => {
                error!(category = %unit.category, error = %e, "Recipient lookup failed, dropping unit");
                return DispatchReport::default();
            }
        };

        let mut handles = Vec::with_capacity(recipients.len());
        for chat_id in recipients {
            let Ok(permit) = Arc::clone(&self.limiter).acquire_owned().await else {
                error!("Delivery limiter closed");
                break;
            };
            let api = self.api.clone();
            let copy = unit.for_recipient(chat_id);
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                deliver(&api, chat_id, &copy).await
            }));
        }

        let mut report = DispatchReport {
            attempted: handles.len(),
            ..Default::default()
        };
        for result in futures::future::join_all(handles).await {
            match result {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    report.failed += 1;
                    error!(error = %e, "Failed to dispatch message");
                }
                Err(e) => {
                    report.failed += 1;
                    error!("Delivery task panicked: {e}");
                }
            }
        }

        info!(
            category = %unit.category,
            %kind,
            delivered = report.delivered,
            failed = report.failed,
            "Dispatch unit fanned out"
        );
        report
    }
}

/// POST one delivery copy. Anything but HTTP 200 is a failure.
async fn deliver(api: &BotApi, chat_id: i64, unit: &DispatchUnit) -> Result<(), DeliveryError> {
    let payload = unit.payload().ok_or_else(|| DeliveryError::Request {
        chat_id,
        reason: "delivery copy has no recipient".into(),
    })?;

    let resp = api
        .post_json(unit.media.endpoint(), &payload)
        .await
        .map_err(|e| DeliveryError::Request {
            chat_id,
            reason: e.to_string(),
        })?;

    let status = resp.status();
    if status != StatusCode::OK {
        let body = resp.text().await.unwrap_or_default();
        return Err(DeliveryError::Status {
            chat_id,
            status: status.as_u16(),
            body,
        });
    }

    debug!(chat_id, caption = ?unit.caption, "Message dispatched");
    Ok(())
}

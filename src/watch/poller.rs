//! Update watcher: polls `getUpdates` on a fixed interval and emits
//! batches of classified dispatch units.
//!
//! Each cycle:
//! 1. wait for the interval (or cancellation)
//! 2. GET updates since the cursor, retrying a transport failure once
//! 3. charge the error budget for bad statuses and malformed bodies
//! 4. advance the cursor past the last update and classify every text
//! 5. send the non-empty batch downstream (blocks while the fan-out is busy)
//!
//! The loop ends when cancelled or when the error budget is exhausted;
//! either way the output channel closes.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::channels::{BotApi, UpdateEnvelope};
use crate::error::{ConfigError, PollError};
use crate::pipeline::{Classifier, DispatchUnit};
use crate::watch::budget::{BudgetPolicy, ErrorBudget, PollCursor};

/// Batches of classified units, watcher → fan-out.
pub type DispatchBatch = Vec<DispatchUnit>;

/// Watcher settings.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Delay between poll cycles.
    pub poll_interval: Duration,
    /// Pause before the single retry of a failed request.
    pub retry_backoff: Duration,
    /// Bad responses tolerated before the watcher stops. Must be > 0.
    pub error_limit: u16,
    pub budget_policy: BudgetPolicy,
    /// The bot's own user id; its messages are ignored. 0 disables the check.
    pub bot_id: i64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            retry_backoff: Duration::from_secs(5),
            error_limit: 10,
            budget_policy: BudgetPolicy::Lifetime,
            bot_id: 0,
        }
    }
}

/// Result of a single poll cycle.
#[derive(Debug)]
pub enum CycleOutcome {
    /// Server unreachable even after the retry. Nothing charged.
    Skipped(PollError),
    /// Bad status or body; charged against the error budget.
    Failed(PollError),
    /// Well-formed response with no updates.
    Empty,
    /// Updates received. Units that failed classification are already dropped.
    Batch(DispatchBatch),
}

/// Long-running poller. Owns the cursor and the error budget.
pub struct UpdateWatcher {
    api: BotApi,
    classifier: Arc<dyn Classifier>,
    config: WatcherConfig,
    cursor: PollCursor,
    budget: ErrorBudget,
}

impl UpdateWatcher {
    pub fn new(
        api: BotApi,
        classifier: Arc<dyn Classifier>,
        config: WatcherConfig,
    ) -> Result<Self, ConfigError> {
        if config.error_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "error_limit".into(),
                message: "must be greater than 0".into(),
            });
        }

        let budget = ErrorBudget::new(config.error_limit, config.budget_policy);
        Ok(Self {
            api,
            classifier,
            config,
            cursor: PollCursor::new(),
            budget,
        })
    }

    pub fn cursor(&self) -> PollCursor {
        self.cursor
    }

    pub fn budget(&self) -> &ErrorBudget {
        &self.budget
    }

    /// Start the watcher on its own task.
    ///
    /// The receiver yields batches until the watcher stops; the channel holds
    /// a single batch, so a slow consumer pauses polling.
    pub fn spawn(
        self,
        cancel: CancellationToken,
    ) -> (mpsc::Receiver<DispatchBatch>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(1);
        let handle = tokio::spawn(self.run(cancel, tx));
        (rx, handle)
    }

    /// Poll until cancelled or out of error budget. Dropping `tx` on return
    /// closes the channel.
    pub async fn run(mut self, cancel: CancellationToken, tx: mpsc::Sender<DispatchBatch>) {
        info!(
            interval = ?self.config.poll_interval,
            error_limit = self.budget.limit(),
            "Watching for updates..."
        );

        loop {
            if self.budget.is_exhausted() {
                error!(
                    errors = self.budget.errors(),
                    limit = self.budget.limit(),
                    "Too many bad responses from the Bot API, giving up"
                );
                break;
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Update watcher cancelled");
                    break;
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }

            if let CycleOutcome::Batch(batch) = self.poll_once().await {
                if batch.is_empty() {
                    continue;
                }
                debug!(units = batch.len(), "Sending batch to fan-out");
                if tx.send(batch).await.is_err() {
                    warn!("Dispatch channel closed, stopping update watcher");
                    break;
                }
            }
        }

        warn!(cursor = self.cursor.offset(), "Update watcher shutting down");
    }

    /// Run one poll cycle: fetch, advance the cursor, classify.
    pub async fn poll_once(&mut self) -> CycleOutcome {
        let envelope = match self.fetch().await {
            Ok(envelope) => envelope,
            Err(e) if e.charges_budget() => {
                self.budget.charge();
                error!(
                    error = %e,
                    errors = self.budget.errors(),
                    limit = self.budget.limit(),
                    "Bad response from getUpdates"
                );
                return CycleOutcome::Failed(e);
            }
            Err(e) => {
                error!(error = %e, "getUpdates skipped this cycle");
                return CycleOutcome::Skipped(e);
            }
        };

        self.budget.record_success();

        let Some(last) = envelope.result.last() else {
            return CycleOutcome::Empty;
        };
        self.cursor.advance_past(last.update_id);
        debug!(
            updates = envelope.result.len(),
            cursor = self.cursor.offset(),
            "Updates received"
        );

        let mut batch = Vec::with_capacity(envelope.result.len());
        for update in &envelope.result {
            if self.config.bot_id != 0 && update.sender_id() == Some(self.config.bot_id) {
                debug!(update_id = update.update_id, "Ignoring the bot's own message");
                continue;
            }

            let Some(text) = update.text() else {
                debug!(update_id = update.update_id, "Update carries no text");
                continue;
            };

            match self.classifier.classify(text).await {
                Ok(unit) => batch.push(unit),
                Err(e) => {
                    warn!(
                        update_id = update.update_id,
                        message = %text,
                        error = %e,
                        "Failed to classify message, dropping update"
                    );
                }
            }
        }

        CycleOutcome::Batch(batch)
    }

    async fn fetch(&self) -> Result<UpdateEnvelope, PollError> {
        let offset = self.cursor.offset();

        let resp = match self.api.get_updates(offset).await {
            Ok(resp) => resp,
            Err(first) => {
                warn!(
                    error = %first,
                    backoff = ?self.config.retry_backoff,
                    "getUpdates failed, retrying once"
                );
                tokio::time::sleep(self.config.retry_backoff).await;
                self.api
                    .get_updates(offset)
                    .await
                    .map_err(|e| PollError::Transport(e.to_string()))?
            }
        };

        if resp.status() != StatusCode::OK {
            return Err(PollError::Status(resp.status().as_u16()));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| PollError::Read(e.without_url().to_string()))?;

        let envelope: UpdateEnvelope =
            serde_json::from_slice(&body).map_err(|e| PollError::Envelope(e.to_string()))?;

        if !envelope.ok {
            return Err(PollError::Envelope("ok=false".into()));
        }

        Ok(envelope)
    }
}

//! Inbound side: polling the Bot API for new updates.

pub mod budget;
pub mod poller;

pub use budget::{BudgetPolicy, ErrorBudget, PollCursor};
pub use poller::{CycleOutcome, DispatchBatch, UpdateWatcher, WatcherConfig};

//! `RecipientDirectory`, the single lookup the fan-out depends on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DirectoryError;
use crate::pipeline::Category;

/// A destination group and the categories it subscribes to.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRecord {
    pub chat_id: i64,
    pub title: String,
    pub categories: Vec<Category>,
    pub added_at: DateTime<Utc>,
}

/// Category → recipient chat ids.
///
/// Implementations must tolerate concurrent calls from many delivery tasks.
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    /// Chat ids subscribed to `category`.
    ///
    /// Returns `DirectoryError::NotFound` rather than an empty list when
    /// nobody is subscribed.
    async fn resolve(&self, category: Category) -> Result<Vec<i64>, DirectoryError>;
}

//! libSQL backend for the recipient directory.
//!
//! Supports local file and in-memory databases. A single connection is
//! reused for all operations; `libsql::Connection` is `Send + Sync`.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info, warn};

use crate::error::DirectoryError;
use crate::pipeline::Category;
use crate::store::migrations;
use crate::store::traits::{GroupRecord, RecipientDirectory};

/// Recipient directory stored in libSQL.
pub struct LibSqlDirectory {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlDirectory {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DirectoryError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DirectoryError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DirectoryError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let directory = Self::from_database(db)?;
        migrations::run_migrations(&directory.conn).await?;
        info!(path = %path.display(), "Recipient directory opened");
        Ok(directory)
    }

    /// Create an in-memory directory (for tests).
    pub async fn new_memory() -> Result<Self, DirectoryError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DirectoryError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let directory = Self::from_database(db)?;
        migrations::run_migrations(&directory.conn).await?;
        Ok(directory)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DirectoryError> {
        let conn = db
            .connect()
            .map_err(|e| DirectoryError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    /// Insert a group or replace its title and category subscriptions.
    pub async fn upsert_group(
        &self,
        chat_id: i64,
        title: &str,
        categories: &[Category],
    ) -> Result<(), DirectoryError> {
        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| DirectoryError::Query(format!("upsert_group begin: {e}")))?;

        tx.execute(
            "INSERT INTO groups (chat_id, title, added_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(chat_id) DO UPDATE SET title = excluded.title",
            params![chat_id, title, Utc::now().to_rfc3339()],
        )
        .await
        .map_err(|e| DirectoryError::Query(format!("upsert_group: {e}")))?;

        tx.execute(
            "DELETE FROM group_categories WHERE chat_id = ?1",
            params![chat_id],
        )
        .await
        .map_err(|e| DirectoryError::Query(format!("upsert_group clear categories: {e}")))?;

        for category in categories {
            tx.execute(
                "INSERT OR IGNORE INTO group_categories (chat_id, category) VALUES (?1, ?2)",
                params![chat_id, category.as_str()],
            )
            .await
            .map_err(|e| DirectoryError::Query(format!("upsert_group category: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| DirectoryError::Query(format!("upsert_group commit: {e}")))?;

        debug!(chat_id, title, ?categories, "Group saved");
        Ok(())
    }

    /// Delete a group and its subscriptions. Returns whether it existed.
    pub async fn remove_group(&self, chat_id: i64) -> Result<bool, DirectoryError> {
        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| DirectoryError::Query(format!("remove_group begin: {e}")))?;

        tx.execute(
            "DELETE FROM group_categories WHERE chat_id = ?1",
            params![chat_id],
        )
        .await
        .map_err(|e| DirectoryError::Query(format!("remove_group categories: {e}")))?;

        let removed = tx
            .execute("DELETE FROM groups WHERE chat_id = ?1", params![chat_id])
            .await
            .map_err(|e| DirectoryError::Query(format!("remove_group: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| DirectoryError::Query(format!("remove_group commit: {e}")))?;

        if removed > 0 {
            debug!(chat_id, "Group removed");
        }
        Ok(removed > 0)
    }

    /// All groups ordered by chat id.
    pub async fn list_groups(&self) -> Result<Vec<GroupRecord>, DirectoryError> {
        let mut rows = self
            .conn
            .query(
                "SELECT g.chat_id, g.title, g.added_at, GROUP_CONCAT(c.category)
                 FROM groups g
                 LEFT JOIN group_categories c ON c.chat_id = g.chat_id
                 GROUP BY g.chat_id
                 ORDER BY g.chat_id",
                (),
            )
            .await
            .map_err(|e| DirectoryError::Query(format!("list_groups: {e}")))?;

        let mut groups = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DirectoryError::Query(format!("list_groups: {e}")))?
        {
            match row_to_group(&row) {
                Ok(group) => groups.push(group),
                Err(e) => warn!("Skipping unreadable group row: {e}"),
            }
        }
        Ok(groups)
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn row_to_group(row: &libsql::Row) -> Result<GroupRecord, libsql::Error> {
    let added_at: String = row.get(2)?;
    let categories: Option<String> = row.get(3).ok();

    let mut categories: Vec<Category> = categories
        .unwrap_or_default()
        .split(',')
        .filter_map(|c| c.parse().ok())
        .collect();
    categories.sort_by_key(|c| c.as_str());

    Ok(GroupRecord {
        chat_id: row.get(0)?,
        title: row.get(1)?,
        categories,
        added_at: parse_datetime(&added_at),
    })
}

// ── RecipientDirectory implementation ───────────────────────────────

#[async_trait]
impl RecipientDirectory for LibSqlDirectory {
    async fn resolve(&self, category: Category) -> Result<Vec<i64>, DirectoryError> {
        let mut rows = self
            .conn
            .query(
                "SELECT DISTINCT chat_id FROM group_categories WHERE category = ?1 ORDER BY chat_id",
                params![category.as_str()],
            )
            .await
            .map_err(|e| DirectoryError::Query(format!("resolve: {e}")))?;

        let mut chat_ids = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DirectoryError::Query(format!("resolve: {e}")))?
        {
            let chat_id: i64 = row
                .get(0)
                .map_err(|e| DirectoryError::Query(format!("resolve row parse: {e}")))?;
            chat_ids.push(chat_id);
        }

        if chat_ids.is_empty() {
            return Err(DirectoryError::NotFound {
                category: category.to_string(),
            });
        }
        Ok(chat_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> LibSqlDirectory {
        LibSqlDirectory::new_memory().await.unwrap()
    }

    #[tokio::test]
    async fn resolve_by_category() {
        let db = test_db().await;
        db.upsert_group(-100, "beef club", &[Category::Beefy, Category::Meaty])
            .await
            .unwrap();
        db.upsert_group(-200, "greens", &[Category::Veggie])
            .await
            .unwrap();
        db.upsert_group(-300, "omnivores", &[Category::Beefy, Category::Veggie])
            .await
            .unwrap();

        assert_eq!(db.resolve(Category::Beefy).await.unwrap(), vec![-300, -100]);
        assert_eq!(db.resolve(Category::Meaty).await.unwrap(), vec![-100]);
        assert_eq!(db.resolve(Category::Veggie).await.unwrap(), vec![-300, -200]);
    }

    #[tokio::test]
    async fn resolve_empty_is_not_found() {
        let db = test_db().await;
        db.upsert_group(-100, "beef club", &[Category::Beefy])
            .await
            .unwrap();

        let err = db.resolve(Category::Veggie).await.unwrap_err();
        assert!(matches!(err, DirectoryError::NotFound { ref category } if category == "veggie"));
    }

    #[tokio::test]
    async fn upsert_replaces_subscriptions() {
        let db = test_db().await;
        db.upsert_group(-100, "club", &[Category::Beefy]).await.unwrap();
        db.upsert_group(-100, "renamed club", &[Category::Meaty])
            .await
            .unwrap();

        assert!(db.resolve(Category::Beefy).await.is_err());
        assert_eq!(db.resolve(Category::Meaty).await.unwrap(), vec![-100]);

        let groups = db.list_groups().await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].title, "renamed club");
        assert_eq!(groups[0].categories, vec![Category::Meaty]);
    }

    #[tokio::test]
    async fn list_groups_includes_unsubscribed() {
        let db = test_db().await;
        db.upsert_group(-5, "quiet", &[]).await.unwrap();
        db.upsert_group(-9, "busy", &[Category::Veggie, Category::Beefy])
            .await
            .unwrap();

        let groups = db.list_groups().await.unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].chat_id, -9);
        assert_eq!(groups[0].categories, vec![Category::Beefy, Category::Veggie]);
        assert_eq!(groups[1].chat_id, -5);
        assert!(groups[1].categories.is_empty());
        assert!(groups[1].added_at > DateTime::<Utc>::MIN_UTC);
    }

    #[tokio::test]
    async fn remove_group_drops_subscriptions() {
        let db = test_db().await;
        db.upsert_group(-100, "club", &[Category::Beefy]).await.unwrap();

        assert!(db.remove_group(-100).await.unwrap());
        assert!(!db.remove_group(-100).await.unwrap());
        assert!(matches!(
            db.resolve(Category::Beefy).await,
            Err(DirectoryError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn remove_group_commits_and_spares_others() {
        let db = test_db().await;
        db.upsert_group(-100, "club", &[Category::Beefy, Category::Meaty])
            .await
            .unwrap();
        db.upsert_group(-200, "pals", &[Category::Beefy]).await.unwrap();

        assert!(db.remove_group(-100).await.unwrap());

        // Connection is back outside a transaction and writable.
        db.upsert_group(-300, "new", &[Category::Meaty]).await.unwrap();

        assert_eq!(db.resolve(Category::Beefy).await.unwrap(), vec![-200]);
        assert_eq!(db.resolve(Category::Meaty).await.unwrap(), vec![-300]);
        let ids: Vec<i64> = db
            .list_groups()
            .await
            .unwrap()
            .iter()
            .map(|g| g.chat_id)
            .collect();
        assert_eq!(ids, vec![-300, -200]);
    }

    #[tokio::test]
    async fn file_database_persists_groups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("relay.db");

        {
            let db = LibSqlDirectory::new_local(&path).await.unwrap();
            db.upsert_group(-42, "persisted", &[Category::Meaty])
                .await
                .unwrap();
        }

        let reopened = LibSqlDirectory::new_local(&path).await.unwrap();
        assert_eq!(reopened.resolve(Category::Meaty).await.unwrap(), vec![-42]);
    }

    #[tokio::test]
    async fn concurrent_resolves() {
        let db = Arc::new(test_db().await);
        db.upsert_group(-1, "a", &[Category::Beefy]).await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let db = Arc::clone(&db);
                tokio::spawn(async move { db.resolve(Category::Beefy).await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), vec![-1]);
        }
    }
}

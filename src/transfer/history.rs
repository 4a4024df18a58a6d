//! Bounded history of finished transfers.
//!
//! Holds at most [`HISTORY_LIMIT`] records; appending beyond that evicts the
//! oldest. Listing is newest-first.
//!
//! Two stores are provided:
//! - [`MemoryHistory`] - process-local, used by tests and one-off runs
//! - [`SqliteHistory`] - SQLx/SQLite, survives restarts
//!
//! # Example
//!
//! ```ignore
//! let history = SqliteHistory::open("sqlite:history.db").await?;
//! history.append(&record).await?;
//! let recent = history.list().await?;
//! ```

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::domain::TransferRecord;

/// Maximum number of records kept.
pub const HISTORY_LIMIT: usize = 50;

/// History store errors
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("History database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("History migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Failed to encode history record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Write/read contract the engine relies on.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Insert at the front, evicting from the tail past the limit.
    async fn append(&self, record: &TransferRecord) -> Result<(), HistoryError>;

    /// All retained records, newest first.
    async fn list(&self) -> Result<Vec<TransferRecord>, HistoryError>;
}

/// In-process history.
pub struct MemoryHistory {
    limit: usize,
    records: Mutex<VecDeque<TransferRecord>>,
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::with_limit(HISTORY_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            records: Mutex::new(VecDeque::with_capacity(limit)),
        }
    }
}

#[async_trait]
impl HistoryStore for MemoryHistory {
    async fn append(&self, record: &TransferRecord) -> Result<(), HistoryError> {
        let mut records = self.records.lock();
        records.push_front(record.clone());
        records.truncate(self.limit);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<TransferRecord>, HistoryError> {
        Ok(self.records.lock().iter().cloned().collect())
    }
}

/// SQLite-backed history.
pub struct SqliteHistory {
    pool: SqlitePool,
    limit: usize,
}

impl SqliteHistory {
    /// Open (creating if needed) the database at `db_url` and run migrations.
    pub async fn open(db_url: &str) -> Result<Self, HistoryError> {
        if !sqlx::Sqlite::database_exists(db_url).await.unwrap_or(false) {
            sqlx::Sqlite::create_database(db_url).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect(db_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self {
            pool,
            limit: HISTORY_LIMIT,
        })
    }

    /// Build a SQLite URL from a file path.
    pub fn url_for(path: &std::path::Path) -> String {
        format!("sqlite:{}", path.display())
    }
}

#[async_trait]
impl HistoryStore for SqliteHistory {
    async fn append(&self, record: &TransferRecord) -> Result<(), HistoryError> {
        let payload = serde_json::to_string(record)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO transfer_history (job_id, record, created_at) VALUES (?, ?, ?)")
            .bind(record.job_id.to_string())
            .bind(&payload)
            .bind(record.timestamp.to_rfc3339())
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            DELETE FROM transfer_history
            WHERE id NOT IN (
                SELECT id FROM transfer_history ORDER BY id DESC LIMIT ?
            )
            "#,
        )
        .bind(self.limit as i64)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<TransferRecord>, HistoryError> {
        let rows: Vec<(i64, String)> =
            sqlx::query_as("SELECT id, record FROM transfer_history ORDER BY id DESC")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(id, payload)| match serde_json::from_str(&payload) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("Skipping unreadable history row {}: {}", id, e);
                    None
                }
            })
            .collect())
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::test_utils::mock_record;
    use proptest::prelude::*;

    proptest! {
        /// Never more than the limit, newest always first.
        #[test]
        fn prop_memory_history_bounded(appends in 1usize..120) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let history = MemoryHistory::new();
                for i in 0..appends {
                    history.append(&mock_record(i)).await.unwrap();
                }
                let records = history.list().await.unwrap();
                prop_assert_eq!(records.len(), appends.min(HISTORY_LIMIT));
                prop_assert_eq!(records[0].transferred_tracks, appends - 1);
                Ok(())
            })?;
        }
    }
}

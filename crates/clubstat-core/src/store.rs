//! SQLite snapshot store with connection pooling
//!
//! The whole sync result is kept as one JSON blob per storage key. Saving
//! stamps `updatedAt` and notifies subscribers so a long-running view can
//! reload when another process (or task) writes a fresh sync.

use chrono::Utc;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::error::Result;
use crate::models::Snapshot;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Key the snapshot blob is stored under
pub const STORAGE_KEY: &str = "costcoReceiptsData";

const CHANGE_CAPACITY: usize = 16;

/// Emitted after every successful save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotChange {
    pub key: String,
    /// Milliseconds since the Unix epoch
    pub updated_at: i64,
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
    changes: broadcast::Sender<SnapshotChange>,
}

impl Database {
    /// Open (or create) the database at `path` and run migrations
    pub fn open(path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder().max_size(10).build(manager)?;
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);

        let db = Self {
            pool,
            db_path: path.to_string(),
            changes,
        };
        db.run_migrations()?;
        debug!("Opened snapshot store at {}", path);

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Throwaway database in the temp directory (for testing)
    ///
    /// A file rather than `:memory:` so every pooled connection sees the
    /// same data.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "clubstat_test_{}_{}.db",
            std::process::id(),
            id
        ));

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::open(&path.to_string_lossy())
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- WAL: readers don't block the sync writer
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            -- One JSON blob per storage key
            CREATE TABLE IF NOT EXISTS snapshots (
                storage_key TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                updated_at INTEGER,
                saved_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );
            "#,
        )?;

        Ok(())
    }

    /// Load the stored snapshot, `None` when nothing was saved yet
    pub fn load_snapshot(&self) -> Result<Option<Snapshot>> {
        let conn = self.conn()?;
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM snapshots WHERE storage_key = ?",
                params![STORAGE_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Replace the stored snapshot, stamping `updated_at` with the current time
    ///
    /// Returns the stamp written.
    pub fn save_snapshot(&self, snapshot: &mut Snapshot) -> Result<i64> {
        let updated_at = Utc::now().timestamp_millis();
        snapshot.updated_at = Some(updated_at);
        let payload = serde_json::to_string(snapshot)?;

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO snapshots (storage_key, payload, updated_at, saved_at)
            VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)
            ON CONFLICT(storage_key) DO UPDATE SET
                payload = excluded.payload,
                updated_at = excluded.updated_at,
                saved_at = excluded.saved_at
            "#,
            params![STORAGE_KEY, payload, updated_at],
        )?;

        info!(
            "Saved snapshot: {} receipts, {} online orders, {} order details",
            snapshot.receipts.len(),
            snapshot.online_orders.len(),
            snapshot.order_details.len()
        );

        // No receivers is fine
        let _ = self.changes.send(SnapshotChange {
            key: STORAGE_KEY.to_string(),
            updated_at,
        });

        Ok(updated_at)
    }

    /// `updatedAt` of the stored snapshot without decoding the payload
    pub fn last_updated(&self) -> Result<Option<i64>> {
        let conn = self.conn()?;
        let updated: Option<Option<i64>> = conn
            .query_row(
                "SELECT updated_at FROM snapshots WHERE storage_key = ?",
                params![STORAGE_KEY],
                |row| row.get(0),
            )
            .optional()?;
        Ok(updated.flatten())
    }

    /// Drop the stored snapshot. Returns whether one existed.
    pub fn clear_snapshot(&self) -> Result<bool> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM snapshots WHERE storage_key = ?",
            params![STORAGE_KEY],
        )?;
        Ok(removed > 0)
    }

    /// Receive a [`SnapshotChange`] after every save through this handle or its clones
    pub fn subscribe(&self) -> broadcast::Receiver<SnapshotChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Snapshot {
        serde_json::from_value(json!({
            "receipts": [
                {"transactionBarcode": "21134300501862401051230", "total": 42.5,
                 "transactionDateTime": "2024-01-05T12:30:00",
                 "itemArray": [{"itemNumber": "1", "itemDescription01": "KS TOWEL", "amount": 42.5, "unit": 1}]}
            ],
            "onlineOrders": [{"orderNumber": "1002", "orderTotal": 19.99}],
            "orderDetails": {}
        }))
        .unwrap()
    }

    #[test]
    fn test_empty_store() {
        let db = Database::in_memory().unwrap();
        assert!(db.load_snapshot().unwrap().is_none());
        assert_eq!(db.last_updated().unwrap(), None);
        assert!(!db.clear_snapshot().unwrap());
    }

    #[test]
    fn test_save_and_load() {
        let db = Database::in_memory().unwrap();
        let mut snapshot = sample();
        let stamp = db.save_snapshot(&mut snapshot).unwrap();

        assert_eq!(snapshot.updated_at, Some(stamp));
        let loaded = db.load_snapshot().unwrap().unwrap();
        assert_eq!(loaded, snapshot);
        assert_eq!(db.last_updated().unwrap(), Some(stamp));
    }

    #[test]
    fn test_save_replaces_previous() {
        let db = Database::in_memory().unwrap();
        let mut first = sample();
        db.save_snapshot(&mut first).unwrap();

        let mut second = Snapshot::default();
        db.save_snapshot(&mut second).unwrap();

        let loaded = db.load_snapshot().unwrap().unwrap();
        assert!(loaded.receipts.is_empty());
        assert!(loaded.online_orders.is_empty());

        let conn = db.conn().unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM snapshots", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_clear_snapshot() {
        let db = Database::in_memory().unwrap();
        db.save_snapshot(&mut sample()).unwrap();
        assert!(db.clear_snapshot().unwrap());
        assert!(db.load_snapshot().unwrap().is_none());
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clubstat.db");
        let path = path.to_string_lossy();

        {
            let db = Database::open(&path).unwrap();
            db.save_snapshot(&mut sample()).unwrap();
        }

        let db = Database::open(&path).unwrap();
        let loaded = db.load_snapshot().unwrap().unwrap();
        assert_eq!(loaded.receipts.len(), 1);
        assert_eq!(db.path(), path);
    }

    #[tokio::test]
    async fn test_subscribe_sees_saves_from_clones() {
        let db = Database::in_memory().unwrap();
        let mut changes = db.subscribe();

        let writer = db.clone();
        let stamp = writer.save_snapshot(&mut sample()).unwrap();

        let change = changes.recv().await.unwrap();
        assert_eq!(change.key, STORAGE_KEY);
        assert_eq!(change.updated_at, stamp);
    }
}

//! SQLite storage layer for AnimAlert.
//!
//! Persists notified sighting ids so that dedup survives process restarts.
//! The schema holds only the sighting id and the time it was first notified.
//! No contact data is stored.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::dedup::DedupStore;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct SqliteDedupStore {
    pool: SqlitePool,
}

impl SqliteDedupStore {
    /// Create a new store and initialize the schema.
    ///
    /// # Arguments
    ///
    /// * `database_url` - SQLite connection string
    ///   (e.g., "sqlite:animalert.db?mode=rwc" or "sqlite::memory:")
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // A single connection keeps "sqlite::memory:" on one database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await?;

        let store = Self { pool };
        store.initialize_schema().await?;

        Ok(store)
    }

    async fn initialize_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS notified_sightings (
                sighting_id TEXT PRIMARY KEY,
                notified_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// When the sighting was first notified, if ever.
    pub async fn notified_at(&self, id: &str) -> anyhow::Result<Option<DateTime<Utc>>> {
        let row = sqlx::query(
            r#"
            SELECT notified_at
            FROM notified_sightings
            WHERE sighting_id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row
            .map(|r| r.get::<i64, _>("notified_at"))
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single()))
    }

    /// Number of sightings recorded as notified.
    pub async fn count(&self) -> anyhow::Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as total FROM notified_sightings")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get("total"))
    }
}

#[async_trait]
impl DedupStore for SqliteDedupStore {
    async fn has_seen(&self, id: &str) -> anyhow::Result<bool> {
        Ok(self.notified_at(id).await?.is_some())
    }

    async fn mark_seen(&self, id: &str) -> anyhow::Result<()> {
        // Keeps the first notification time on forced re-sends
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO notified_sightings (sighting_id, notified_at)
            VALUES (?, ?)
            "#,
        )
        .bind(id)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

//! SQLite-backed cart slot.
//!
//! One row per device profile in `cart_slots`. The database file is created
//! on first use.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;
use tokio::sync::Mutex;

use crate::config::ClientConfig;
use crate::store::CartStore;

/// Durable cart slot for one profile.
///
/// Cheap to clone; clones share the lazily opened pool.
#[derive(Debug, Clone)]
pub struct SqliteCartStore {
    path: PathBuf,
    profile: String,
    pool: Arc<Mutex<Option<SqlitePool>>>,
}

impl SqliteCartStore {
    /// Slot for `profile` in the database at `path` (not opened until first use).
    pub fn new(path: impl Into<PathBuf>, profile: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            profile: profile.into(),
            pool: Arc::new(Mutex::new(None)),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.cart_db_path(), config.profile.clone())
    }

    async fn pool(&self) -> anyhow::Result<SqlitePool> {
        let mut guard = self.pool.lock().await;
        if let Some(pool) = guard.as_ref() {
            return Ok(pool.clone());
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create cart directory at {parent:?}"))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .with_context(|| format!("failed to open cart database at {:?}", self.path))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cart_slots (
                profile   TEXT PRIMARY KEY,
                data      TEXT NOT NULL,
                saved_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .context("failed to create cart_slots table")?;

        tracing::debug!(path = ?self.path, "opened cart database");
        *guard = Some(pool.clone());
        Ok(pool)
    }
}

#[async_trait]
impl CartStore for SqliteCartStore {
    async fn read(&self) -> anyhow::Result<Option<String>> {
        let pool = self.pool().await?;
        sqlx::query_scalar::<_, String>("SELECT data FROM cart_slots WHERE profile = ?1")
            .bind(&self.profile)
            .fetch_optional(&pool)
            .await
            .context("failed to read cart slot")
    }

    async fn write(&self, data: String) -> anyhow::Result<()> {
        let pool = self.pool().await?;
        sqlx::query(
            r#"
            INSERT INTO cart_slots (profile, data, saved_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(profile) DO UPDATE SET
                data = excluded.data,
                saved_at = excluded.saved_at
            "#,
        )
        .bind(&self.profile)
        .bind(data)
        .bind(Utc::now().to_rfc3339())
        .execute(&pool)
        .await
        .context("failed to write cart slot")?;
        Ok(())
    }

    async fn erase(&self) -> anyhow::Result<()> {
        let pool = self.pool().await?;
        sqlx::query("DELETE FROM cart_slots WHERE profile = ?1")
            .bind(&self.profile)
            .execute(&pool)
            .await
            .context("failed to erase cart slot")?;
        Ok(())
    }
}

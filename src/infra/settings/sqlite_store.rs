// SQLite-backed settings store: a plain key/value table.
//
// Reads never fail from the caller's point of view. A database error is
// logged and treated as "not set", so the caller's default applies.

use crate::core::settings::SettingsStore;
use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

pub struct SqliteSettingsStore {
    pool: SqlitePool,
}

impl SqliteSettingsStore {
    pub async fn new(pool: SqlitePool) -> anyhow::Result<Self> {
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES (?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn get_raw(&self, key: &str) -> Option<String> {
        match sqlx::query("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
        {
            Ok(row) => row.map(|r| r.get("value")),
            Err(e) => {
                tracing::error!(key, error = %e, "Failed to read setting");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::{QUOTA_FREE_LIMIT, QUOTA_PERIOD};
    use crate::infra::marketplace::SqliteMarketplaceStore;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn values_persist_and_overwrite() {
        let tmp = NamedTempFile::new().unwrap();
        let marketplace = SqliteMarketplaceStore::new(tmp.path().to_str().unwrap())
            .await
            .unwrap();
        let settings = SqliteSettingsStore::new(marketplace.pool()).await.unwrap();

        assert_eq!(settings.get_raw(QUOTA_PERIOD).await, None);
        settings.set(QUOTA_PERIOD, "week").await.unwrap();
        settings.set(QUOTA_PERIOD, "month").await.unwrap();
        settings.set(QUOTA_FREE_LIMIT, "4").await.unwrap();

        assert_eq!(settings.get_string(QUOTA_PERIOD, "day").await, "month");
        assert_eq!(settings.get_int(QUOTA_FREE_LIMIT, 1).await, 4);
    }
}

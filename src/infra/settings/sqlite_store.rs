use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};

use crate::core::settings::{SettingsStore, StoreError, UserSettings};

/// SQLite-backed settings store, one row per user.
pub struct SqliteSettingsStore {
    pool: Pool<Sqlite>,
}

impl SqliteSettingsStore {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure the file exists if it's a file path
        let path_str = database_url.trim_start_matches("sqlite://");
        if !database_url.contains(":memory:") && !Path::new(path_str).exists() {
            if let Some(parent) = Path::new(path_str).parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::File::create(path_str)?;
        }

        let conn_str = if database_url.starts_with("sqlite:") {
            database_url.to_string()
        } else {
            format!("sqlite://{}", database_url)
        };

        let pool = SqlitePoolOptions::new().connect(&conn_str).await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_drive_settings (
                user_id TEXT PRIMARY KEY,
                google_folder_id TEXT NOT NULL,
                google_spreadsheet_id TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserSettings>, StoreError> {
        let row = sqlx::query(
            "SELECT google_folder_id, google_spreadsheet_id, updated_at \
             FROM user_drive_settings WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let updated_at_raw: String = row.get("updated_at");
        let updated_at = DateTime::parse_from_rfc3339(&updated_at_raw)
            .map_err(|e| StoreError::Database(format!("bad updated_at timestamp: {}", e)))?
            .with_timezone(&Utc);

        Ok(Some(UserSettings {
            user_id: user_id.to_string(),
            drive_folder_id: row.get("google_folder_id"),
            spreadsheet_id: row.get("google_spreadsheet_id"),
            updated_at,
        }))
    }

    async fn upsert(&self, settings: &UserSettings) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO user_drive_settings (user_id, google_folder_id, google_spreadsheet_id, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                google_folder_id = excluded.google_folder_id,
                google_spreadsheet_id = excluded.google_spreadsheet_id,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&settings.user_id)
        .bind(&settings.drive_folder_id)
        .bind(&settings.spreadsheet_id)
        .bind(settings.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_store() -> (tempfile::TempDir, SqliteSettingsStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.db");
        let store = SqliteSettingsStore::new(path.to_str().unwrap())
            .await
            .unwrap();
        (dir, store)
    }

    fn settings(user_id: &str, folder: &str, sheet: &str) -> UserSettings {
        UserSettings {
            user_id: user_id.to_string(),
            drive_folder_id: folder.to_string(),
            spreadsheet_id: sheet.to_string(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn missing_user_yields_none() {
        let (_dir, store) = temp_store().await;
        assert!(store.get("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let (_dir, store) = temp_store().await;
        store
            .upsert(&settings("u1", "folder-a", "sheet-a"))
            .await
            .unwrap();

        let loaded = store.get("u1").await.unwrap().unwrap();
        assert_eq!(loaded.drive_folder_id, "folder-a");
        assert_eq!(loaded.spreadsheet_id, "sheet-a");
    }

    #[tokio::test]
    async fn second_upsert_replaces_the_row() {
        let (_dir, store) = temp_store().await;
        store
            .upsert(&settings("u1", "folder-a", "sheet-a"))
            .await
            .unwrap();
        store
            .upsert(&settings("u1", "folder-b", "sheet-b"))
            .await
            .unwrap();

        let loaded = store.get("u1").await.unwrap().unwrap();
        assert_eq!(loaded.drive_folder_id, "folder-b");

        // Still exactly one row for the user.
        let count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM user_drive_settings")
            .fetch_one(&store.pool)
            .await
            .map(|row| row.get("n"))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn users_do_not_share_settings() {
        let (_dir, store) = temp_store().await;
        store
            .upsert(&settings("u1", "folder-a", "sheet-a"))
            .await
            .unwrap();
        store
            .upsert(&settings("u2", "folder-b", "sheet-b"))
            .await
            .unwrap();

        assert_eq!(
            store.get("u1").await.unwrap().unwrap().drive_folder_id,
            "folder-a"
        );
        assert_eq!(
            store.get("u2").await.unwrap().unwrap().drive_folder_id,
            "folder-b"
        );
    }
}

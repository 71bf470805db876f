use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which Drive folder and spreadsheet a user has connected. One row per
/// authenticated user, upserted on save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub user_id: String,
    pub drive_folder_id: String,
    pub spreadsheet_id: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<UserSettings>, StoreError>;
    async fn upsert(&self, settings: &UserSettings) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Google DriveのフォルダIDまたはスプレッドシートIDが設定されていません。")]
    NotConfigured,
}

pub struct SettingsService<S: SettingsStore> {
    store: S,
}

impl<S: SettingsStore> SettingsService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn get(&self, user_id: &str) -> Result<Option<UserSettings>, SettingsError> {
        Ok(self.store.get(user_id).await?)
    }

    /// Like `get`, but absence is a configuration error the caller surfaces
    /// to the user with guidance.
    pub async fn require(&self, user_id: &str) -> Result<UserSettings, SettingsError> {
        self.store
            .get(user_id)
            .await?
            .ok_or(SettingsError::NotConfigured)
    }

    pub async fn save(
        &self,
        user_id: &str,
        drive_folder_id: &str,
        spreadsheet_id: &str,
    ) -> Result<UserSettings, SettingsError> {
        let settings = UserSettings {
            user_id: user_id.to_string(),
            drive_folder_id: drive_folder_id.to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
            updated_at: Utc::now(),
        };
        self.store.upsert(&settings).await?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryStore {
        rows: Mutex<HashMap<String, UserSettings>>,
    }

    #[async_trait]
    impl SettingsStore for InMemoryStore {
        async fn get(&self, user_id: &str) -> Result<Option<UserSettings>, StoreError> {
            Ok(self.rows.lock().unwrap().get(user_id).cloned())
        }

        async fn upsert(&self, settings: &UserSettings) -> Result<(), StoreError> {
            self.rows
                .lock()
                .unwrap()
                .insert(settings.user_id.clone(), settings.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn save_then_get_round_trips() {
        let service = SettingsService::new(InMemoryStore::default());
        service.save("u1", "folder-a", "sheet-a").await.unwrap();

        let loaded = service.get("u1").await.unwrap().unwrap();
        assert_eq!(loaded.drive_folder_id, "folder-a");
        assert_eq!(loaded.spreadsheet_id, "sheet-a");
    }

    #[tokio::test]
    async fn save_overwrites_previous_settings() {
        let service = SettingsService::new(InMemoryStore::default());
        service.save("u1", "folder-a", "sheet-a").await.unwrap();
        service.save("u1", "folder-b", "sheet-b").await.unwrap();

        let loaded = service.get("u1").await.unwrap().unwrap();
        assert_eq!(loaded.drive_folder_id, "folder-b");
    }

    #[tokio::test]
    async fn require_fails_for_unconfigured_user() {
        let service = SettingsService::new(InMemoryStore::default());
        let err = service.require("nobody").await.unwrap_err();
        assert!(matches!(err, SettingsError::NotConfigured));
    }
}

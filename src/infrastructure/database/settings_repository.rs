use crate::domain::entities::{Setting, SettingKey};
use crate::infrastructure::database::connection::DbPool;
use crate::infrastructure::database::mappers::{setting_from_row, timestamp_to_datetime};
use crate::infrastructure::database::rows::SettingRow;
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};

/// 設定テーブル（キー・バリュー）への型付きアクセス。
///
/// 同期オーケストレータだけがここへ書き込む。タイムスタンプ系のキーは
/// unix秒の文字列、`offline_mode` は "true"/"false" で保持する。
pub struct SettingsRepository {
    pool: DbPool,
}

impl SettingsRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, key: SettingKey) -> Result<Option<Setting>, AppError> {
        let row = sqlx::query_as::<_, SettingRow>(
            "SELECT key, value, updated_at FROM settings WHERE key = ?1",
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(setting_from_row))
    }

    pub async fn set(&self, key: SettingKey, value: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key.as_str())
        .bind(value)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_timestamp(&self, key: SettingKey) -> Result<Option<DateTime<Utc>>, AppError> {
        let setting = self.get(key).await?;
        Ok(setting
            .and_then(|s| s.value.parse::<i64>().ok())
            .map(timestamp_to_datetime))
    }

    pub async fn set_timestamp(
        &self,
        key: SettingKey,
        at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.set(key, &at.timestamp().to_string()).await
    }

    /// 未設定なら無効（false）扱い。
    pub async fn offline_mode(&self) -> Result<bool, AppError> {
        let setting = self.get(SettingKey::OfflineMode).await?;
        Ok(setting.map(|s| s.value == "true").unwrap_or(false))
    }

    pub async fn set_offline_mode(&self, enabled: bool) -> Result<(), AppError> {
        let value = if enabled { "true" } else { "false" };
        self.set(SettingKey::OfflineMode, value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::connection::Database;

    async fn setup_repo() -> SettingsRepository {
        let pool = Database::initialize_in_memory().await.unwrap();
        SettingsRepository::new(pool)
    }

    #[tokio::test]
    async fn test_set_upserts_value() {
        let repo = setup_repo().await;

        repo.set(SettingKey::LastSyncTimestamp, "100").await.unwrap();
        repo.set(SettingKey::LastSyncTimestamp, "200").await.unwrap();

        let setting = repo.get(SettingKey::LastSyncTimestamp).await.unwrap().unwrap();
        assert_eq!(setting.value, "200");
    }

    #[tokio::test]
    async fn test_timestamp_round_trip() {
        let repo = setup_repo().await;
        let at = timestamp_to_datetime(1_700_000_000);

        repo.set_timestamp(SettingKey::LastSuccessfulSync, at)
            .await
            .unwrap();

        let stored = repo
            .get_timestamp(SettingKey::LastSuccessfulSync)
            .await
            .unwrap();
        assert_eq!(stored, Some(at));
    }

    #[tokio::test]
    async fn test_offline_mode_defaults_to_disabled() {
        let repo = setup_repo().await;

        assert!(!repo.offline_mode().await.unwrap());

        repo.set_offline_mode(true).await.unwrap();
        assert!(repo.offline_mode().await.unwrap());

        repo.set_offline_mode(false).await.unwrap();
        assert!(!repo.offline_mode().await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_key_is_none() {
        let repo = setup_repo().await;
        assert!(repo.get(SettingKey::LastFullSync).await.unwrap().is_none());
        assert!(repo
            .get_timestamp(SettingKey::LastFullSync)
            .await
            .unwrap()
            .is_none());
    }
}

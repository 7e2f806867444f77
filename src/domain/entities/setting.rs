use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 設定テーブルが保持するキーの閉じた集合。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKey {
    LastFullSync,
    LastSyncTimestamp,
    LastSuccessfulSync,
    OfflineMode,
}

impl SettingKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::LastFullSync => "last_full_sync",
            SettingKey::LastSyncTimestamp => "last_sync_timestamp",
            SettingKey::LastSuccessfulSync => "last_successful_sync",
            SettingKey::OfflineMode => "offline_mode",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

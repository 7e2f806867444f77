use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub remote: RemoteConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// APIサーバのベースURL（例: `https://api.example.com`）
    pub base_url: String,
    /// HTTPコールごとのタイムアウト（秒）
    pub request_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub auto_sync: bool,
    /// 定期同期の間隔（秒）
    pub sync_interval: u64,
    /// アップロード失敗時のリトライ上限
    pub max_retry: u32,
    /// 1回の同期パスでドレインするキューエントリ数の上限
    pub batch_size: u32,
    /// 上限超過エントリをキューから掃き出すまでの保持期間（日）
    pub retention_days: i64,
    /// 初回同期時にさかのぼる日数
    pub initial_window_days: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite:data/denpyo.db".to_string(),
                max_connections: 5,
            },
            remote: RemoteConfig {
                base_url: "http://localhost:8080".to_string(),
                request_timeout: 30,
            },
            sync: SyncConfig::default(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auto_sync: true,
            sync_interval: 300, // 5 minutes
            max_retry: 3,
            batch_size: 50,
            retention_days: 7,
            initial_window_days: 30,
        }
    }
}

// オフラインファーストの同期コア。
// ローカルSQLiteを唯一の読み書き先とし、接続回復・周期タイマー・手動要求を
// きっかけにリモートAPIと双方向同期する。

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;
pub mod state;

pub use application::ports::{CredentialProvider, RemoteGateway};
pub use application::services::{SyncOutcome, SyncReport, SyncService, SyncTrigger};
pub use domain::entities::{SettingKey, SyncStats};
pub use domain::value_objects::{RecordPayload, SyncOperation, SyncState, SyncTable};
pub use shared::config::AppConfig;
pub use shared::error::AppError;
pub use state::AppContext;

/// ログ設定の初期化。組み込み先のアプリ起動時に一度だけ呼ぶ。
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "denpyo_sync=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

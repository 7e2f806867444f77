use crate::application::ports::{CredentialProvider, RemoteGateway};
use crate::application::services::{SyncOutcome, SyncService, SyncTrigger};
use crate::domain::entities::{DeadLetter, SyncStats};
use crate::domain::value_objects::SyncState;
use crate::infrastructure::connectivity::ConnectivityMonitor;
use crate::infrastructure::database::{
    Database, DbPool, LocalStore, SettingsRepository, SyncQueueRepository,
};
use crate::infrastructure::remote::HttpRemoteGateway;
use crate::shared::config::AppConfig;
use crate::shared::error::AppError;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// アプリケーション全体の合成ルート。
///
/// ストア・監視・オーケストレータを明示的に組み立て、バックグラウンド
/// タスクの寿命を握る。`init` で構築し、使い終わったら `shutdown` で
/// タスク停止とプールのクローズまで面倒を見る。
pub struct AppContext {
    pool: DbPool,
    store: Arc<LocalStore>,
    queue: Arc<SyncQueueRepository>,
    monitor: Arc<ConnectivityMonitor>,
    sync_service: Arc<SyncService>,
    tasks: Vec<JoinHandle<()>>,
}

impl AppContext {
    /// 本番構成。HTTPゲートウェイを設定から組み立てる。
    pub async fn init(
        config: AppConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> anyhow::Result<Self> {
        let gateway: Arc<dyn RemoteGateway> =
            Arc::new(HttpRemoteGateway::new(&config.remote, credentials)?);
        Self::init_with_gateway(config, gateway).await
    }

    /// ゲートウェイ差し替え構成。テストや別トランスポートの注入に使う。
    pub async fn init_with_gateway(
        config: AppConfig,
        gateway: Arc<dyn RemoteGateway>,
    ) -> anyhow::Result<Self> {
        let pool =
            Database::initialize(&config.database.url, config.database.max_connections).await?;

        let store = Arc::new(LocalStore::new(pool.clone()));
        let queue = Arc::new(SyncQueueRepository::new(pool.clone()));
        let settings = Arc::new(SettingsRepository::new(pool.clone()));
        let monitor = Arc::new(ConnectivityMonitor::new());

        let sync_service = Arc::new(SyncService::new(
            Arc::clone(&store),
            Arc::clone(&queue),
            settings,
            gateway,
            monitor.subscribe(),
            config.sync.clone(),
        ));

        let mut tasks = vec![sync_service.spawn_connectivity_listener()];
        if config.sync.auto_sync {
            tasks.push(sync_service.schedule_sync());
        }

        info!("Application context initialized");

        Ok(Self {
            pool,
            store,
            queue,
            monitor,
            sync_service,
            tasks,
        })
    }

    /// ローカルストア。アプリの読み書きはすべてここを通る。
    pub fn store(&self) -> Arc<LocalStore> {
        Arc::clone(&self.store)
    }

    /// 到達可能性の監視。プラットフォームのコールバックから
    /// `set_interface`/`set_online` で状態を供給する。
    pub fn monitor(&self) -> Arc<ConnectivityMonitor> {
        Arc::clone(&self.monitor)
    }

    pub fn sync_service(&self) -> Arc<SyncService> {
        Arc::clone(&self.sync_service)
    }

    pub fn connectivity_stream(&self) -> watch::Receiver<bool> {
        self.monitor.subscribe()
    }

    pub fn sync_state_stream(&self) -> watch::Receiver<SyncState> {
        self.sync_service.subscribe_state()
    }

    pub async fn force_sync(&self) -> Result<SyncOutcome, AppError> {
        self.sync_service.force_sync().await
    }

    pub async fn sync_stats(&self) -> Result<SyncStats, AppError> {
        self.sync_service.sync_stats().await
    }

    pub async fn set_offline_mode(&self, enabled: bool) -> Result<(), AppError> {
        self.sync_service.set_offline_mode(enabled).await
    }

    /// リトライ上限で退避されたエントリの一覧。運用側の回収用。
    pub async fn dead_letters(&self) -> Result<Vec<DeadLetter>, AppError> {
        self.queue.dead_letters().await
    }

    /// 起動直後の同期。オンラインであれば1パス仕掛ける。
    /// 初回（`last_full_sync` 未設定）はダウンロード窓が初期窓まで開く。
    pub async fn sync_on_startup(&self) {
        self.sync_service.try_sync(SyncTrigger::Startup).await;
    }

    /// バックグラウンドタスクを止めてプールを閉じる。
    pub async fn shutdown(mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.pool.close().await;
        info!("Application context shut down");
    }
}

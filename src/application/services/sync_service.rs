use crate::application::ports::RemoteGateway;
use crate::domain::entities::{SettingKey, SyncStats};
use crate::domain::value_objects::{SyncOperation, SyncState, SyncTable};
use crate::infrastructure::database::{
    LocalStore, RemoteApplyOutcome, SettingsRepository, SyncQueueRepository,
};
use crate::shared::config::SyncConfig;
use crate::shared::error::AppError;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;
use tracing::{debug, error, info, warn};

/// 同期を起動したきっかけ。ログの区別にだけ使う。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    Connectivity,
    Timer,
    Startup,
    Manual,
}

impl SyncTrigger {
    fn as_str(&self) -> &'static str {
        match self {
            SyncTrigger::Connectivity => "connectivity",
            SyncTrigger::Timer => "timer",
            SyncTrigger::Startup => "startup",
            SyncTrigger::Manual => "manual",
        }
    }
}

/// 1回の同期パスの集計。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// アップロードに成功してキューから消し込んだ件数
    pub uploaded: u32,
    /// 失敗したがリトライ余地を残してキューに戻した件数
    pub upload_failures: u32,
    /// 上限到達でデッドレターへ移した件数
    pub dead_lettered: u32,
    /// ダウンロードでローカルに適用（挿入・置換）した件数
    pub applied: u32,
    /// LWW判定で適用を見送った件数
    pub skipped: u32,
    /// クリーンアップで掃き出した件数
    pub swept: u32,
}

/// 同期要求の結果。パスが走らなかった場合も区別して返す。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed(SyncReport),
    /// 既に別のパスが進行中だったため何もしなかった
    AlreadyRunning,
}

/// 同期オーケストレータ。
///
/// 接続回復・周期タイマー・手動要求の3系統のトリガーを1つの「パスを試す」
/// 動作に束ね、進行中フラグで直列化する。パスはアップロード→ダウンロード→
/// クリーンアップ→設定更新の順で、開始したら接続が落ちても中断しない
/// （次のリモートコールで自然に失敗する）。
pub struct SyncService {
    store: Arc<LocalStore>,
    queue: Arc<SyncQueueRepository>,
    settings: Arc<SettingsRepository>,
    gateway: Arc<dyn RemoteGateway>,
    connectivity: watch::Receiver<bool>,
    config: SyncConfig,
    is_syncing: Arc<RwLock<bool>>,
    state_tx: watch::Sender<SyncState>,
}

impl SyncService {
    pub fn new(
        store: Arc<LocalStore>,
        queue: Arc<SyncQueueRepository>,
        settings: Arc<SettingsRepository>,
        gateway: Arc<dyn RemoteGateway>,
        connectivity: watch::Receiver<bool>,
        config: SyncConfig,
    ) -> Self {
        let (state_tx, _rx) = watch::channel(SyncState::Idle);
        Self {
            store,
            queue,
            settings,
            gateway,
            connectivity,
            config,
            is_syncing: Arc::new(RwLock::new(false)),
            state_tx,
        }
    }

    /// 同期状態ストリーム。最新値のみ保持する。
    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.state_tx.subscribe()
    }

    pub fn current_state(&self) -> SyncState {
        *self.state_tx.borrow()
    }

    pub fn is_online(&self) -> bool {
        *self.connectivity.borrow()
    }

    /// 自動トリガー用の入口。オフライン・オフラインモード・進行中は
    /// 黙って見送り、パスの失敗も呼び出し元へは伝播しない
    /// （状態ストリームからのみ観測できる）。
    pub async fn try_sync(&self, trigger: SyncTrigger) {
        if !self.is_online() {
            debug!("Skipping {} sync: offline", trigger.as_str());
            return;
        }
        match self.settings.offline_mode().await {
            Ok(true) => {
                debug!("Skipping {} sync: offline mode enabled", trigger.as_str());
                return;
            }
            Ok(false) => {}
            Err(err) => {
                error!("Failed to read offline mode setting: {}", err);
                return;
            }
        }

        match self.sync_once(trigger).await {
            Ok(SyncOutcome::AlreadyRunning) => {
                debug!("Skipping {} sync: already in progress", trigger.as_str());
            }
            Ok(SyncOutcome::Completed(report)) => {
                debug!("{} sync finished: {:?}", trigger.as_str(), report);
            }
            Err(err) => {
                warn!("{} sync failed: {}", trigger.as_str(), err);
            }
        }
    }

    /// 手動同期。オフライン時は明示的に拒否し、パスの失敗は呼び出し元へ
    /// 伝播する。進行中の場合だけはエラーではなく `AlreadyRunning` を返す。
    pub async fn force_sync(&self) -> Result<SyncOutcome, AppError> {
        if !self.is_online() {
            return Err(AppError::Offline("Cannot sync while offline".to_string()));
        }
        if self.settings.offline_mode().await? {
            return Err(AppError::Offline(
                "Cannot sync while offline mode is enabled".to_string(),
            ));
        }
        self.sync_once(SyncTrigger::Manual).await
    }

    /// 進行中フラグを握ってから1パス実行する。フラグが立っていたら即座に
    /// `AlreadyRunning` を返す（check-and-set、パスは常に1本だけ）。
    async fn sync_once(&self, trigger: SyncTrigger) -> Result<SyncOutcome, AppError> {
        {
            let mut syncing = self.is_syncing.write().await;
            if *syncing {
                return Ok(SyncOutcome::AlreadyRunning);
            }
            *syncing = true;
        }

        let pass_id = Uuid::new_v4();
        let _ = self.state_tx.send(SyncState::Syncing);
        info!("Sync pass {} started ({})", pass_id, trigger.as_str());

        let result = self.run_pass().await;

        {
            let mut syncing = self.is_syncing.write().await;
            *syncing = false;
        }

        match result {
            Ok(report) => {
                let _ = self.state_tx.send(SyncState::Success);
                info!(
                    "Sync pass {} succeeded: uploaded={} failed={} dead_lettered={} applied={} skipped={} swept={}",
                    pass_id,
                    report.uploaded,
                    report.upload_failures,
                    report.dead_lettered,
                    report.applied,
                    report.skipped,
                    report.swept,
                );
                Ok(SyncOutcome::Completed(report))
            }
            Err(err) => {
                let _ = self.state_tx.send(SyncState::Failed);
                warn!("Sync pass {} failed: {}", pass_id, err);
                Err(err)
            }
        }
    }

    /// 双方向同期の本体。アップロード→ダウンロード→クリーンアップ→設定更新。
    /// 初回（`last_full_sync` 未設定）はダウンロード窓が初期窓いっぱいに開く。
    async fn run_pass(&self) -> Result<SyncReport, AppError> {
        let initial = self
            .settings
            .get(SettingKey::LastFullSync)
            .await?
            .is_none();

        let mut report = SyncReport::default();
        self.upload_phase(&mut report).await?;
        self.download_phase(&mut report).await?;
        report.swept = self
            .queue
            .sweep_exhausted(self.config.max_retry, self.config.retention_days)
            .await?;

        let now = Utc::now();
        self.settings
            .set_timestamp(SettingKey::LastSyncTimestamp, now)
            .await?;
        self.settings
            .set_timestamp(SettingKey::LastSuccessfulSync, now)
            .await?;
        if initial {
            self.settings
                .set_timestamp(SettingKey::LastFullSync, now)
                .await?;
        }

        Ok(report)
    }

    /// キューをFIFO順に1件ずつ送る。同一レコードのINSERT→UPDATEの順序を
    /// 守るため並列化はしない。個々の失敗はパスを止めず、リトライ上限に
    /// 達したエントリはデッドレターへ移す。
    async fn upload_phase(&self, report: &mut SyncReport) -> Result<(), AppError> {
        let entries = self.queue.pending_entries(self.config.batch_size).await?;
        if entries.is_empty() {
            return Ok(());
        }
        debug!("Uploading {} queued mutations", entries.len());

        for entry in entries {
            let payload = entry
                .operation
                .carries_payload()
                .then_some(&entry.payload);

            match self
                .gateway
                .push_mutation(entry.table, entry.operation, entry.record_id, payload)
                .await
            {
                Ok(()) => {
                    self.queue.remove_entry(entry.id).await?;
                    if entry.operation != SyncOperation::Delete {
                        self.store
                            .mark_synced(entry.table, entry.record_id, Utc::now())
                            .await?;
                    }
                    report.uploaded += 1;
                }
                Err(err) => {
                    warn!(
                        "Upload of {} {} record {} failed: {}",
                        entry.operation, entry.table, entry.record_id, err
                    );
                    let retries = self
                        .queue
                        .increment_retry(entry.id, &err.to_string())
                        .await?;
                    if retries >= self.config.max_retry {
                        self.queue
                            .move_to_dead_letters(entry.id, Utc::now())
                            .await?;
                        report.dead_lettered += 1;
                    } else {
                        report.upload_failures += 1;
                    }
                }
            }
        }

        Ok(())
    }

    /// テーブルごとに `since` 以降の差分を取得してLWWで適用する。
    /// 通信エラーはそのまま伝播してパスを失敗させる
    /// （アップロード済みの結果は巻き戻さない）。
    async fn download_phase(&self, report: &mut SyncReport) -> Result<(), AppError> {
        let since = self
            .settings
            .get_timestamp(SettingKey::LastSyncTimestamp)
            .await?
            .unwrap_or_else(|| Utc::now() - Duration::days(self.config.initial_window_days));

        for table in SyncTable::ALL {
            let records = self.gateway.pull_changes(table, since).await?;
            for payload in &records {
                match self.store.apply_remote(table, payload).await? {
                    RemoteApplyOutcome::Inserted | RemoteApplyOutcome::Replaced => {
                        report.applied += 1;
                    }
                    RemoteApplyOutcome::Skipped => report.skipped += 1,
                }
            }
        }

        Ok(())
    }

    /// 周期トリガー。オンラインかつ進行中でなければ低優先のパスを仕掛ける。
    pub fn schedule_sync(self: &Arc<Self>) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(service.config.sync_interval));
            // 最初のtickは即時に発火するため読み捨てる
            interval.tick().await;
            loop {
                interval.tick().await;
                service.try_sync(SyncTrigger::Timer).await;
            }
        })
    }

    /// 接続状態の遷移を待ち受けるタスク。オンライン復帰のエッジで同期を
    /// 仕掛け、切断時は `Offline` を公開する（進行中のパスは中断しない）。
    pub fn spawn_connectivity_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let service = Arc::clone(self);
        let mut rx = service.connectivity.clone();
        tokio::spawn(async move {
            loop {
                if rx.changed().await.is_err() {
                    break;
                }
                let online = *rx.borrow_and_update();
                if online {
                    info!("Connectivity restored, attempting sync");
                    service.try_sync(SyncTrigger::Connectivity).await;
                } else {
                    let _ = service.state_tx.send(SyncState::Offline);
                }
            }
        })
    }

    /// 同期状況のスナップショットを算出する。
    pub async fn sync_stats(&self) -> Result<SyncStats, AppError> {
        Ok(SyncStats {
            pending_count: self.queue.pending_count().await?,
            dead_letter_count: self.queue.dead_letter_count().await?,
            last_successful_sync: self
                .settings
                .get_timestamp(SettingKey::LastSuccessfulSync)
                .await?,
            is_online: self.is_online(),
            is_syncing: *self.is_syncing.read().await,
        })
    }

    pub async fn set_offline_mode(&self, enabled: bool) -> Result<(), AppError> {
        self.settings.set_offline_mode(enabled).await
    }
}

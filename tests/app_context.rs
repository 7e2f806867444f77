// 合成ルートの結合テスト。ディスク上のDBで組み立てから停止までを通す。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use denpyo_sync::application::ports::RemoteGateway;
use denpyo_sync::domain::value_objects::{RecordPayload, SyncOperation, SyncState, SyncTable};
use denpyo_sync::shared::config::AppConfig;
use denpyo_sync::shared::error::AppError;
use denpyo_sync::AppContext;
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[derive(Default)]
struct CountingGateway {
    pushes: AtomicU32,
    pulls: AtomicU32,
}

#[async_trait]
impl RemoteGateway for CountingGateway {
    async fn push_mutation(
        &self,
        _table: SyncTable,
        _operation: SyncOperation,
        _record_id: i64,
        _payload: Option<&RecordPayload>,
    ) -> Result<(), AppError> {
        self.pushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn pull_changes(
        &self,
        _table: SyncTable,
        _since: DateTime<Utc>,
    ) -> Result<Vec<RecordPayload>, AppError> {
        self.pulls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

fn config_for(dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.database.url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("denpyo.db").display()
    );
    config.database.max_connections = 1;
    config
}

#[tokio::test]
async fn test_context_syncs_after_reconnect_and_shuts_down() {
    let dir = TempDir::new().unwrap();
    let gateway = Arc::new(CountingGateway::default());

    let context = AppContext::init_with_gateway(config_for(&dir), Arc::clone(&gateway) as _)
        .await
        .unwrap();

    let store = context.store();
    store
        .insert(
            SyncTable::Invoices,
            RecordPayload::new(json!({
                "customer": "Acme",
                "amount": 100.0,
                "status": "draft",
                "issued_on": null,
            }))
            .unwrap(),
        )
        .await
        .unwrap();

    let stats = context.sync_stats().await.unwrap();
    assert_eq!(stats.pending_count, 1);
    assert!(!stats.is_online);

    let mut states = context.sync_state_stream();
    let mut connectivity = context.connectivity_stream();

    context.monitor().set_online(true);
    assert!(connectivity.changed().await.is_ok());
    assert!(*connectivity.borrow_and_update());

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if *states.borrow_and_update() == SyncState::Success {
                break;
            }
            states.changed().await.unwrap();
        }
    })
    .await
    .expect("timed out waiting for sync to succeed");

    assert_eq!(gateway.pushes.load(Ordering::SeqCst), 1);
    assert_eq!(gateway.pulls.load(Ordering::SeqCst), SyncTable::ALL.len() as u32);

    let stats = context.sync_stats().await.unwrap();
    assert_eq!(stats.pending_count, 0);
    assert!(stats.last_successful_sync.is_some());

    context.shutdown().await;
}

#[tokio::test]
async fn test_context_disconnect_publishes_offline_state() {
    let dir = TempDir::new().unwrap();
    let gateway = Arc::new(CountingGateway::default());

    let context = AppContext::init_with_gateway(config_for(&dir), gateway as _)
        .await
        .unwrap();

    let mut states = context.sync_state_stream();

    context.monitor().set_online(true);
    context.monitor().set_online(false);

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if *states.borrow_and_update() == SyncState::Offline {
                break;
            }
            states.changed().await.unwrap();
        }
    })
    .await
    .expect("timed out waiting for offline state");

    context.shutdown().await;
}

use crate::domain::value_objects::{RecordPayload, SyncOperation, SyncTable};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// リモートAPIとの境界。
///
/// アップロードは (テーブル, 操作) ごとに1コール、ダウンロードはテーブルごとに
/// `since` 以降の差分を取得する。HTTPの詳細はインフラ層の実装に閉じ込める。
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// キューに積まれたミューテーション1件をサーバへ反映する。
    /// `payload` はINSERT/UPDATEのボディで、DELETEでは `None`。
    async fn push_mutation(
        &self,
        table: SyncTable,
        operation: SyncOperation,
        record_id: i64,
        payload: Option<&RecordPayload>,
    ) -> Result<(), AppError>;

    /// `since` 以降に変更されたリモートレコードを取得する。
    async fn pull_changes(
        &self,
        table: SyncTable,
        since: DateTime<Utc>,
    ) -> Result<Vec<RecordPayload>, AppError>;
}

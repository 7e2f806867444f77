use crate::domain::value_objects::{RecordPayload, SyncOperation, SyncTable};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// リトライ上限に達してキューから退避されたエントリ。
///
/// 元実装はこれらを黙って破棄していた。運用側で回収できるよう保管に変更している。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetter {
    pub id: i64,
    pub queue_id: i64,
    pub table: SyncTable,
    pub record_id: i64,
    pub operation: SyncOperation,
    pub payload: RecordPayload,
    pub retry_count: u32,
    pub failed_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

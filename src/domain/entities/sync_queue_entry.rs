use crate::domain::value_objects::{RecordPayload, SyncOperation, SyncTable};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// ローカルミューテーション1件ぶんの未送信ログ。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncQueueEntry {
    pub id: i64,
    pub table: SyncTable,
    pub record_id: i64,
    pub operation: SyncOperation,
    pub payload: RecordPayload,
    pub created_at: DateTime<Utc>,
    pub retry_count: u32,
    pub last_error: Option<String>,
}

impl SyncQueueEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: i64,
        table: SyncTable,
        record_id: i64,
        operation: SyncOperation,
        payload: RecordPayload,
        created_at: DateTime<Utc>,
        retry_count: u32,
        last_error: Option<String>,
    ) -> Self {
        Self {
            id,
            table,
            record_id,
            operation,
            payload,
            created_at,
            retry_count,
            last_error,
        }
    }
}

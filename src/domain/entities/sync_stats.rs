use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 要求時に算出される同期状況のスナップショット。永続化しない。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncStats {
    pub pending_count: u32,
    pub dead_letter_count: u32,
    pub last_successful_sync: Option<DateTime<Utc>>,
    pub is_online: bool,
    pub is_syncing: bool,
}

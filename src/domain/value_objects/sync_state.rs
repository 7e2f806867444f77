use serde::{Deserialize, Serialize};
use std::fmt;

/// オーケストレータが公開する同期状態。
///
/// `Idle → Syncing → {Success, Failed}` と遷移し、切断中は `Offline` を示す。
/// ステータスストリームは最新値のみを保持する（イベントログではない）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    Syncing,
    Success,
    Failed,
    Offline,
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Idle => "idle",
            SyncState::Syncing => "syncing",
            SyncState::Success => "success",
            SyncState::Failed => "failed",
            SyncState::Offline => "offline",
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

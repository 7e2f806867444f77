use serde::{Deserialize, Serialize};
use std::fmt;

/// ローカル列の型。行とJSONペイロードの相互変換に使う。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Real,
    Text,
}

/// 同期対象テーブルの閉じた集合。
///
/// 各バリアントが自分のエンドポイントと列定義を持つので、テーブル追加は
/// ここへのバリアント追加としてコンパイル時に検査される。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTable {
    Users,
    ChatSessions,
    ChatMessages,
    Invoices,
    QueryLogs,
}

impl SyncTable {
    pub const ALL: [SyncTable; 5] = [
        SyncTable::Users,
        SyncTable::ChatSessions,
        SyncTable::ChatMessages,
        SyncTable::Invoices,
        SyncTable::QueryLogs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncTable::Users => "users",
            SyncTable::ChatSessions => "chat_sessions",
            SyncTable::ChatMessages => "chat_messages",
            SyncTable::Invoices => "invoices",
            SyncTable::QueryLogs => "query_logs",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        match value {
            "users" => Ok(SyncTable::Users),
            "chat_sessions" => Ok(SyncTable::ChatSessions),
            "chat_messages" => Ok(SyncTable::ChatMessages),
            "invoices" => Ok(SyncTable::Invoices),
            "query_logs" => Ok(SyncTable::QueryLogs),
            other => Err(format!("Unknown sync table: {}", other)),
        }
    }

    /// ミューテーション系エンドポイントのコレクションパス（`/api/{table}`）。
    pub fn collection_path(&self) -> String {
        format!("/api/{}", self.as_str())
    }

    /// 単一レコードを指すパス（`/api/{table}/{id}`）。
    pub fn record_path(&self, record_id: i64) -> String {
        format!("/api/{}/{}", self.as_str(), record_id)
    }

    /// 差分ダウンロードのパス（`/api/sync/{table}`）。
    pub fn pull_path(&self) -> String {
        format!("/api/sync/{}", self.as_str())
    }

    /// `id` を除くローカル列の定義。ペイロードのシリアライザを兼ねる。
    pub fn columns(&self) -> &'static [(&'static str, ColumnKind)] {
        match self {
            SyncTable::Users => &[
                ("display_name", ColumnKind::Text),
                ("email", ColumnKind::Text),
                ("created_at", ColumnKind::Integer),
                ("updated_at", ColumnKind::Integer),
            ],
            SyncTable::ChatSessions => &[
                ("user_id", ColumnKind::Integer),
                ("title", ColumnKind::Text),
                ("created_at", ColumnKind::Integer),
                ("updated_at", ColumnKind::Integer),
            ],
            SyncTable::ChatMessages => &[
                ("session_id", ColumnKind::Integer),
                ("role", ColumnKind::Text),
                ("content", ColumnKind::Text),
                ("created_at", ColumnKind::Integer),
                ("updated_at", ColumnKind::Integer),
            ],
            SyncTable::Invoices => &[
                ("customer", ColumnKind::Text),
                ("amount", ColumnKind::Real),
                ("status", ColumnKind::Text),
                ("issued_on", ColumnKind::Text),
                ("created_at", ColumnKind::Integer),
                ("updated_at", ColumnKind::Integer),
            ],
            SyncTable::QueryLogs => &[
                ("user_id", ColumnKind::Integer),
                ("query_text", ColumnKind::Text),
                ("created_at", ColumnKind::Integer),
                ("updated_at", ColumnKind::Integer),
            ],
        }
    }
}

impl fmt::Display for SyncTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_every_variant() {
        for table in SyncTable::ALL {
            assert_eq!(SyncTable::parse(table.as_str()).unwrap(), table);
        }
    }

    #[test]
    fn test_parse_rejects_unknown_table() {
        assert!(SyncTable::parse("sessions").is_err());
    }

    #[test]
    fn test_endpoint_paths() {
        assert_eq!(SyncTable::Invoices.collection_path(), "/api/invoices");
        assert_eq!(SyncTable::Invoices.record_path(42), "/api/invoices/42");
        assert_eq!(SyncTable::ChatMessages.pull_path(), "/api/sync/chat_messages");
    }

    #[test]
    fn test_columns_always_carry_timestamps() {
        for table in SyncTable::ALL {
            let names: Vec<&str> = table.columns().iter().map(|(name, _)| *name).collect();
            assert!(names.contains(&"created_at"));
            assert!(names.contains(&"updated_at"));
        }
    }
}

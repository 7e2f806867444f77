use crate::domain::value_objects::RecordPayload;
use serde::{Deserialize, Serialize};

// 同期対象のドメインレコード群。タイムスタンプはunix秒で持ち、
// ペイロード（JSONスナップショット）とはserde経由で相互変換する。

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub display_name: String,
    pub email: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub user_id: Option<i64>,
    pub title: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub session_id: Option<i64>,
    pub role: String,
    pub content: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub customer: String,
    pub amount: f64,
    pub status: Option<String>,
    pub issued_on: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryLog {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub user_id: Option<i64>,
    pub query_text: String,
    pub created_at: i64,
    pub updated_at: i64,
}

macro_rules! impl_payload_conversion {
    ($($record:ty),+ $(,)?) => {
        $(
            impl $record {
                pub fn to_payload(&self) -> Result<RecordPayload, String> {
                    let value = serde_json::to_value(self)
                        .map_err(|err| format!("Failed to serialize record: {}", err))?;
                    RecordPayload::new(value)
                }

                pub fn from_payload(payload: &RecordPayload) -> Result<Self, String> {
                    serde_json::from_value(payload.as_json().clone())
                        .map_err(|err| format!("Failed to deserialize record: {}", err))
                }
            }
        )+
    };
}

impl_payload_conversion!(User, ChatSession, ChatMessage, Invoice, QueryLog);

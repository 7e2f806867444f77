use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// レコードスナップショットのJSONペイロード。
///
/// キューに積むスナップショットと、ダウンロードで受け取るリモートレコードの
/// 両方をこの型で扱う。トップレベルがJSONオブジェクトであることだけを保証する。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordPayload(Value);

impl RecordPayload {
    pub fn new(value: Value) -> Result<Self, String> {
        if !value.is_object() {
            return Err("Record payload must be a JSON object".to_string());
        }
        Ok(Self(value))
    }

    pub fn from_json_str(raw: &str) -> Result<Self, String> {
        let value: Value =
            serde_json::from_str(raw).map_err(|err| format!("Invalid payload JSON: {}", err))?;
        Self::new(value)
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }

    pub fn into_inner(self) -> Value {
        self.0
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// `id` フィールド。リモートレコードとキュースナップショットの識別子。
    pub fn record_id(&self) -> Option<i64> {
        self.0.get("id").and_then(Value::as_i64)
    }

    /// `id` を差し替えたスナップショットを返す（INSERT確定後の付番に使う）。
    pub fn with_record_id(mut self, record_id: i64) -> Self {
        if let Value::Object(map) = &mut self.0 {
            map.insert("id".to_string(), Value::from(record_id));
        }
        self
    }

    /// LWW比較に使うタイムスタンプ。`updated_at` が無ければ `created_at`。
    ///
    /// unix秒の整数とRFC3339文字列の両方を受け付ける。
    pub fn conflict_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp_field("updated_at")
            .or_else(|| self.timestamp_field("created_at"))
    }

    fn timestamp_field(&self, field: &str) -> Option<DateTime<Utc>> {
        match self.0.get(field) {
            Some(Value::Number(num)) => num.as_i64().and_then(|ts| {
                DateTime::<Utc>::from_timestamp(ts, 0)
                    .or_else(|| DateTime::<Utc>::from_timestamp_millis(ts))
            }),
            Some(Value::String(raw)) => DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            _ => None,
        }
    }
}

impl fmt::Display for RecordPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

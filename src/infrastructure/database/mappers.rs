use crate::domain::entities::{DeadLetter, Setting, SyncQueueEntry};
use crate::domain::value_objects::{RecordPayload, SyncOperation, SyncTable};
use crate::infrastructure::database::rows::{DeadLetterRow, SettingRow, SyncQueueEntryRow};
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};

pub fn queue_entry_from_row(row: SyncQueueEntryRow) -> Result<SyncQueueEntry, AppError> {
    let table = SyncTable::parse(&row.table_name).map_err(AppError::ValidationError)?;
    let operation = SyncOperation::parse(&row.operation).map_err(AppError::ValidationError)?;
    let payload = RecordPayload::from_json_str(&row.payload)
        .map_err(AppError::DeserializationError)?;

    Ok(SyncQueueEntry::new(
        row.id,
        table,
        row.record_id,
        operation,
        payload,
        timestamp_to_datetime(row.created_at),
        try_i64_to_u32(row.retry_count, "retry_count")?,
        row.last_error,
    ))
}

pub fn dead_letter_from_row(row: DeadLetterRow) -> Result<DeadLetter, AppError> {
    let table = SyncTable::parse(&row.table_name).map_err(AppError::ValidationError)?;
    let operation = SyncOperation::parse(&row.operation).map_err(AppError::ValidationError)?;
    let payload = RecordPayload::from_json_str(&row.payload)
        .map_err(AppError::DeserializationError)?;

    Ok(DeadLetter {
        id: row.id,
        queue_id: row.queue_id,
        table,
        record_id: row.record_id,
        operation,
        payload,
        retry_count: try_i64_to_u32(row.retry_count, "retry_count")?,
        failed_at: timestamp_to_datetime(row.failed_at),
        last_error: row.last_error,
    })
}

pub fn setting_from_row(row: SettingRow) -> Setting {
    Setting {
        key: row.key,
        value: row.value,
        updated_at: timestamp_to_datetime(row.updated_at),
    }
}

pub fn timestamp_to_datetime(ts: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .or_else(|| DateTime::<Utc>::from_timestamp_millis(ts))
        .unwrap_or_else(Utc::now)
}

fn try_i64_to_u32(value: i64, label: &str) -> Result<u32, AppError> {
    value
        .try_into()
        .map_err(|_| AppError::ValidationError(format!("{label} cannot be negative")))
}

use crate::domain::value_objects::{ColumnKind, RecordPayload, SyncOperation, SyncTable};
use crate::infrastructure::database::connection::DbPool;
use crate::infrastructure::database::sync_queue_repository;
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row, Sqlite};
use tracing::debug;

/// ダウンロード適用の結果。LWW判定でスキップされたかどうかを呼び出し側に返す。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteApplyOutcome {
    Inserted,
    Replaced,
    Skipped,
}

/// ローカルの永続ストア。
///
/// アプリからの書き込みは常にローカルへ同期的にコミットし、同一トランザクション内で
/// 同期キューへのエントリ追加とダーティマークを済ませる。ネットワーク状態によって
/// 失敗することはない。失敗はストレージ層のエラーのみで、そのまま呼び出し元へ伝播する。
pub struct LocalStore {
    pool: DbPool,
}

impl LocalStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// レコードを挿入し、INSERTエントリをキューに積む。採番されたローカルIDを返す。
    pub async fn insert(
        &self,
        table: SyncTable,
        payload: RecordPayload,
    ) -> Result<i64, AppError> {
        let now = Utc::now().timestamp();
        let mut value = payload.into_inner();
        if let Value::Object(map) = &mut value {
            map.entry("created_at").or_insert(Value::from(now));
            map.entry("updated_at").or_insert(Value::from(now));
        }
        let payload = RecordPayload::new(value).map_err(AppError::ValidationError)?;

        let columns = table.columns();
        let column_list = columns
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}, is_synced) VALUES ({}, 0)",
            table.as_str(),
            column_list,
            placeholders
        );

        let mut tx = self.pool.begin().await?;

        let mut query = sqlx::query(&sql);
        for (name, kind) in columns {
            query = bind_column(query, *kind, name, payload.get(name))?;
        }
        let result = query.execute(&mut *tx).await?;
        let record_id = result.last_insert_rowid();

        let snapshot = payload.with_record_id(record_id);
        sync_queue_repository::append_entry(
            &mut *tx,
            table,
            record_id,
            SyncOperation::Insert,
            &snapshot,
            now,
        )
        .await?;

        tx.commit().await?;

        debug!("Inserted {} record {}", table, record_id);
        Ok(record_id)
    }

    /// レコードを更新し、UPDATEエントリをキューに積む。`updated_at` はここで打刻する。
    pub async fn update(
        &self,
        table: SyncTable,
        record_id: i64,
        payload: RecordPayload,
    ) -> Result<(), AppError> {
        let now = Utc::now().timestamp();
        let mut value = payload.into_inner();
        if let Value::Object(map) = &mut value {
            map.insert("updated_at".to_string(), Value::from(now));
        }
        let payload = RecordPayload::new(value)
            .map_err(AppError::ValidationError)?
            .with_record_id(record_id);

        let columns = table.columns();
        let assignments = columns
            .iter()
            .map(|(name, _)| format!("{} = ?", name))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {}, is_synced = 0 WHERE id = ?",
            table.as_str(),
            assignments
        );

        let mut tx = self.pool.begin().await?;

        let mut query = sqlx::query(&sql);
        for (name, kind) in columns {
            query = bind_column(query, *kind, name, payload.get(name))?;
        }
        let result = query.bind(record_id).execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "{} record {} does not exist",
                table, record_id
            )));
        }

        sync_queue_repository::append_entry(
            &mut *tx,
            table,
            record_id,
            SyncOperation::Update,
            &payload,
            now,
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// レコードを削除し、最終スナップショット付きのDELETEエントリをキューに積む。
    pub async fn delete(&self, table: SyncTable, record_id: i64) -> Result<(), AppError> {
        let now = Utc::now().timestamp();

        let snapshot = self
            .fetch(table, record_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("{} record {} does not exist", table, record_id))
            })?;

        let sql = format!("DELETE FROM {} WHERE id = ?", table.as_str());

        let mut tx = self.pool.begin().await?;

        sqlx::query(&sql).bind(record_id).execute(&mut *tx).await?;

        sync_queue_repository::append_entry(
            &mut *tx,
            table,
            record_id,
            SyncOperation::Delete,
            &snapshot,
            now,
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// ローカルレコードをJSONスナップショットとして読み出す。
    pub async fn fetch(
        &self,
        table: SyncTable,
        record_id: i64,
    ) -> Result<Option<RecordPayload>, AppError> {
        let column_list = table
            .columns()
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT id, {} FROM {} WHERE id = ?",
            column_list,
            table.as_str()
        );

        let row = sqlx::query(&sql)
            .bind(record_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| row_to_payload(table, &row)).transpose()
    }

    /// アップロード成功後の消し込み。`is_synced = 1` と `last_sync` を打刻する。
    pub async fn mark_synced(
        &self,
        table: SyncTable,
        record_id: i64,
        synced_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let sql = format!(
            "UPDATE {} SET is_synced = 1, last_sync = ?1 WHERE id = ?2",
            table.as_str()
        );
        sqlx::query(&sql)
            .bind(synced_at.timestamp())
            .bind(record_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// 未反映のローカル変更を持つレコード数。
    pub async fn dirty_count(&self, table: SyncTable) -> Result<u32, AppError> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE is_synced = 0",
            table.as_str()
        );
        let (count,): (i64,) = sqlx::query_as(&sql).fetch_one(&self.pool).await?;
        Ok(count as u32)
    }

    /// リモートレコードをlast-writer-winsでローカルへ適用する。
    ///
    /// ローカルに存在しなければ挿入、存在する場合はリモートのタイムスタンプが
    /// 厳密に新しいときだけ行全体を置き換える。フィールド単位のマージはしない。
    pub async fn apply_remote(
        &self,
        table: SyncTable,
        payload: &RecordPayload,
    ) -> Result<RemoteApplyOutcome, AppError> {
        let record_id = payload.record_id().ok_or_else(|| {
            AppError::ValidationError(format!("Remote {} record is missing an id", table))
        })?;

        let local_ts = self.conflict_timestamp(table, record_id).await?;
        match local_ts {
            None => {
                self.insert_from_remote(table, record_id, payload).await?;
                Ok(RemoteApplyOutcome::Inserted)
            }
            Some(local_ts) => {
                let remote_is_newer = payload
                    .conflict_timestamp()
                    .map(|remote_ts| remote_ts > local_ts)
                    .unwrap_or(false);
                if remote_is_newer {
                    self.replace_from_remote(table, record_id, payload).await?;
                    Ok(RemoteApplyOutcome::Replaced)
                } else {
                    Ok(RemoteApplyOutcome::Skipped)
                }
            }
        }
    }

    async fn conflict_timestamp(
        &self,
        table: SyncTable,
        record_id: i64,
    ) -> Result<Option<DateTime<Utc>>, AppError> {
        let sql = format!(
            "SELECT COALESCE(updated_at, created_at) FROM {} WHERE id = ?",
            table.as_str()
        );
        let row: Option<(i64,)> = sqlx::query_as(&sql)
            .bind(record_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(ts,)| super::mappers::timestamp_to_datetime(ts)))
    }

    async fn insert_from_remote(
        &self,
        table: SyncTable,
        record_id: i64,
        payload: &RecordPayload,
    ) -> Result<(), AppError> {
        let now = Utc::now().timestamp();
        let columns = table.columns();
        let column_list = columns
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} (id, {}, last_sync, is_synced) VALUES (?, {}, ?, 1)",
            table.as_str(),
            column_list,
            placeholders
        );

        let mut query = sqlx::query(&sql).bind(record_id);
        for (name, kind) in columns {
            query = bind_column(query, *kind, name, payload.get(name))?;
        }
        query.bind(now).execute(&self.pool).await?;
        Ok(())
    }

    async fn replace_from_remote(
        &self,
        table: SyncTable,
        record_id: i64,
        payload: &RecordPayload,
    ) -> Result<(), AppError> {
        let now = Utc::now().timestamp();
        let columns = table.columns();
        let assignments = columns
            .iter()
            .map(|(name, _)| format!("{} = ?", name))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {}, last_sync = ?, is_synced = 1 WHERE id = ?",
            table.as_str(),
            assignments
        );

        let mut query = sqlx::query(&sql);
        for (name, kind) in columns {
            query = bind_column(query, *kind, name, payload.get(name))?;
        }
        query.bind(now).bind(record_id).execute(&self.pool).await?;
        Ok(())
    }
}

fn bind_column<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    kind: ColumnKind,
    name: &str,
    value: Option<&Value>,
) -> Result<Query<'q, Sqlite, SqliteArguments<'q>>, AppError> {
    let query = match (kind, value) {
        (ColumnKind::Integer, None) | (ColumnKind::Integer, Some(Value::Null)) => {
            query.bind(None::<i64>)
        }
        (ColumnKind::Integer, Some(value)) => {
            let number = value.as_i64().ok_or_else(|| {
                AppError::ValidationError(format!("Field {} must be an integer", name))
            })?;
            query.bind(number)
        }
        (ColumnKind::Real, None) | (ColumnKind::Real, Some(Value::Null)) => {
            query.bind(None::<f64>)
        }
        (ColumnKind::Real, Some(value)) => {
            let number = value.as_f64().ok_or_else(|| {
                AppError::ValidationError(format!("Field {} must be a number", name))
            })?;
            query.bind(number)
        }
        (ColumnKind::Text, None) | (ColumnKind::Text, Some(Value::Null)) => {
            query.bind(None::<String>)
        }
        (ColumnKind::Text, Some(value)) => {
            let text = value.as_str().ok_or_else(|| {
                AppError::ValidationError(format!("Field {} must be a string", name))
            })?;
            query.bind(text.to_string())
        }
    };
    Ok(query)
}

fn row_to_payload(table: SyncTable, row: &SqliteRow) -> Result<RecordPayload, AppError> {
    let mut map = serde_json::Map::new();
    let id: i64 = row.try_get("id")?;
    map.insert("id".to_string(), Value::from(id));

    for (name, kind) in table.columns() {
        let value = match kind {
            ColumnKind::Integer => row
                .try_get::<Option<i64>, _>(*name)?
                .map(Value::from)
                .unwrap_or(Value::Null),
            ColumnKind::Real => row
                .try_get::<Option<f64>, _>(*name)?
                .map(Value::from)
                .unwrap_or(Value::Null),
            ColumnKind::Text => row
                .try_get::<Option<String>, _>(*name)?
                .map(Value::from)
                .unwrap_or(Value::Null),
        };
        map.insert((*name).to_string(), value);
    }

    RecordPayload::new(Value::Object(map)).map_err(AppError::ValidationError)
}

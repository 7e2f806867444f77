use crate::domain::entities::{DeadLetter, SyncQueueEntry};
use crate::domain::value_objects::{RecordPayload, SyncOperation, SyncTable};
use crate::infrastructure::database::connection::DbPool;
use crate::infrastructure::database::mappers::{dead_letter_from_row, queue_entry_from_row};
use crate::infrastructure::database::rows::{DeadLetterRow, SyncQueueEntryRow};
use crate::shared::error::AppError;
use chrono::{DateTime, Duration, Utc};
use sqlx::Sqlite;
use tracing::debug;

/// ミューテーションと同一トランザクション内でキューエントリを追加する。
///
/// `LocalStore` の書き込みトランザクションから呼ばれるため、
/// プールではなくExecutorを受け取る。
pub async fn append_entry<'e, E>(
    executor: E,
    table: SyncTable,
    record_id: i64,
    operation: SyncOperation,
    payload: &RecordPayload,
    created_at: i64,
) -> Result<i64, AppError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO sync_queue (table_name, record_id, operation, payload, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(table.as_str())
    .bind(record_id)
    .bind(operation.as_str())
    .bind(payload.to_string())
    .bind(created_at)
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

/// 同期キューとデッドレターの永続化。
pub struct SyncQueueRepository {
    pool: DbPool,
}

impl SyncQueueRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// 未送信エントリをFIFO順で取得する。1パスあたりの件数は上限で区切る。
    pub async fn pending_entries(&self, limit: u32) -> Result<Vec<SyncQueueEntry>, AppError> {
        let rows = sqlx::query_as::<_, SyncQueueEntryRow>(
            r#"
            SELECT id, table_name, record_id, operation, payload,
                   created_at, retry_count, last_error
            FROM sync_queue
            ORDER BY created_at ASC, id ASC
            LIMIT ?1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(queue_entry_from_row).collect()
    }

    pub async fn pending_count(&self) -> Result<u32, AppError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sync_queue")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u32)
    }

    /// アップロード成功後の消し込み。既に無いIDに対しては何もしない。
    pub async fn remove_entry(&self, queue_id: i64) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sync_queue WHERE id = ?1")
            .bind(queue_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// 失敗回数を加算して、加算後の回数を返す。エラー文言も記録する。
    /// 既にキューから消えているIDに対しては何もせず0を返す。
    pub async fn increment_retry(&self, queue_id: i64, error: &str) -> Result<u32, AppError> {
        sqlx::query(
            "UPDATE sync_queue SET retry_count = retry_count + 1, last_error = ?1 WHERE id = ?2",
        )
        .bind(error)
        .bind(queue_id)
        .execute(&self.pool)
        .await?;

        let row: Option<(i64,)> = sqlx::query_as("SELECT retry_count FROM sync_queue WHERE id = ?1")
            .bind(queue_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some((count,)) => Ok(count as u32),
            None => {
                debug!("Retry increment on missing queue entry {}", queue_id);
                Ok(0)
            }
        }
    }

    /// リトライ上限に達したエントリをキューからデッドレターへ移す。
    /// 既にキューに無い場合は何もしない。
    pub async fn move_to_dead_letters(
        &self,
        queue_id: i64,
        failed_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, SyncQueueEntryRow>(
            r#"
            SELECT id, table_name, record_id, operation, payload,
                   created_at, retry_count, last_error
            FROM sync_queue
            WHERE id = ?1
            "#,
        )
        .bind(queue_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(());
        };

        sqlx::query(
            r#"
            INSERT INTO dead_letters
                (queue_id, table_name, record_id, operation, payload,
                 retry_count, failed_at, last_error)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(row.id)
        .bind(&row.table_name)
        .bind(row.record_id)
        .bind(&row.operation)
        .bind(&row.payload)
        .bind(row.retry_count)
        .bind(failed_at.timestamp())
        .bind(&row.last_error)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM sync_queue WHERE id = ?1")
            .bind(queue_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(
            "Moved queue entry {} ({} {}) to dead letters",
            row.id, row.operation, row.table_name
        );
        Ok(())
    }

    /// 保持期間を過ぎてもリトライ上限のままキューに残っているエントリを
    /// デッドレターへ掃き出す。移動した件数を返す。
    pub async fn sweep_exhausted(
        &self,
        max_retry: u32,
        retention_days: i64,
    ) -> Result<u32, AppError> {
        let now = Utc::now();
        let cutoff = (now - Duration::days(retention_days)).timestamp();

        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT id FROM sync_queue WHERE retry_count >= ?1 AND created_at < ?2",
        )
        .bind(max_retry as i64)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        let swept = rows.len() as u32;
        for (queue_id,) in rows {
            self.move_to_dead_letters(queue_id, now).await?;
        }

        Ok(swept)
    }

    pub async fn dead_letters(&self) -> Result<Vec<DeadLetter>, AppError> {
        let rows = sqlx::query_as::<_, DeadLetterRow>(
            r#"
            SELECT id, queue_id, table_name, record_id, operation, payload,
                   retry_count, failed_at, last_error
            FROM dead_letters
            ORDER BY failed_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(dead_letter_from_row).collect()
    }

    pub async fn dead_letter_count(&self) -> Result<u32, AppError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM dead_letters")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u32)
    }
}

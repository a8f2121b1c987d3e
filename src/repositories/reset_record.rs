use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{NewResetRecord, ResetRecord, ResetRecordPatch, ResetStatus};
use crate::repositories::ResetRecordStore;

#[derive(Clone)]
pub struct ResetRecordRepository {
    pool: PgPool,
}

impl ResetRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResetRecordStore for ResetRecordRepository {
    /// メールアドレスの最新レコードを検索
    ///
    /// # Note
    /// 同一メールの過去レコードは削除されないため、常に created_at 降順の
    /// 先頭1件のみを返す
    async fn find_latest(
        &self,
        email: &str,
        status: Option<ResetStatus>,
    ) -> Result<Option<ResetRecord>, AppError> {
        let record = sqlx::query_as::<_, ResetRecord>(
            r#"
            SELECT id, email, status, code_hash, code_expires_at, attempts_left,
                   resend_available_at, daily_resend_count, window_started_at,
                   token_hash, token_expires_at, subject_id, created_at, updated_at
            FROM reset_requests
            WHERE email = $1 AND ($2::reset_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(email)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// 新しいリセットレコードを作成
    ///
    /// status=pending、daily_resend_count=1、ウィンドウ起点=NOW() で挿入
    async fn create(&self, record: NewResetRecord) -> Result<ResetRecord, AppError> {
        let created = sqlx::query_as::<_, ResetRecord>(
            r#"
            INSERT INTO reset_requests
                (email, code_hash, code_expires_at, attempts_left, resend_available_at, subject_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, email, status, code_hash, code_expires_at, attempts_left,
                      resend_available_at, daily_resend_count, window_started_at,
                      token_hash, token_expires_at, subject_id, created_at, updated_at
            "#,
        )
        .bind(&record.email)
        .bind(&record.code_hash)
        .bind(record.code_expires_at)
        .bind(record.attempts_left)
        .bind(record.resend_available_at)
        .bind(record.subject_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// レコードを更新（楽観ロック）
    ///
    /// # Errors
    /// 読み取り後に他のリクエストが先に更新していた場合は `AppError::Conflict`
    async fn update(
        &self,
        id: Uuid,
        seen_updated_at: OffsetDateTime,
        patch: ResetRecordPatch,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE reset_requests
            SET status = $3, code_hash = $4, code_expires_at = $5, attempts_left = $6,
                resend_available_at = $7, daily_resend_count = $8, window_started_at = $9,
                token_hash = $10, token_expires_at = $11, updated_at = NOW()
            WHERE id = $1 AND updated_at = $2
            "#,
        )
        .bind(id)
        .bind(seen_updated_at)
        .bind(patch.status)
        .bind(&patch.code_hash)
        .bind(patch.code_expires_at)
        .bind(patch.attempts_left)
        .bind(patch.resend_available_at)
        .bind(patch.daily_resend_count)
        .bind(patch.window_started_at)
        .bind(&patch.token_hash)
        .bind(patch.token_expires_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict);
        }

        Ok(())
    }

    /// レコードを expired（終端）へ遷移
    ///
    /// 消費済み・期限切れのレコードは二度と使えないため無条件に適用する。
    /// 行自体はレート制限の履歴として残す
    async fn mark_expired(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE reset_requests
            SET status = 'expired', code_hash = NULL, code_expires_at = NULL,
                token_hash = NULL, token_expires_at = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

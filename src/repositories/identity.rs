use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::Subject;
use crate::repositories::IdentityStore;
use crate::services::hasher;

#[derive(Clone)]
pub struct IdentityRepository {
    pool: PgPool,
}

impl IdentityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for IdentityRepository {
    /// メールアドレスでアカウントを検索
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Subject>, AppError> {
        let subject = sqlx::query_as::<_, Subject>(
            r#"
            SELECT id, email, display_name
            FROM accounts
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(subject)
    }

    /// アカウントの認証情報を更新
    ///
    /// # Note
    /// new_password および生成したハッシュはログに出力しないこと
    async fn set_credential(&self, subject_id: Uuid, new_password: &str) -> Result<(), AppError> {
        let password_hash = hasher::hash_secret_blocking(new_password.to_string()).await?;

        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET password_hash = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(subject_id)
        .bind(&password_hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::error!(subject_id = %subject_id, "認証情報の更新対象アカウントが存在しない");
            return Err(AppError::Internal(anyhow::anyhow!(
                "account not found for credential update"
            )));
        }

        Ok(())
    }
}

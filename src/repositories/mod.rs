use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{NewResetRecord, ResetRecord, ResetRecordPatch, ResetStatus, Subject};

pub mod identity;
pub mod reset_record;

pub use identity::IdentityRepository;
pub use reset_record::ResetRecordRepository;

/// リセットレコードの永続化
///
/// 「最新」はメールアドレスごとに created_at 降順で解決する。
/// update は読み取り時の updated_at を条件とした楽観ロック付きで、
/// 条件不一致は `AppError::Conflict` を返す。
#[async_trait]
pub trait ResetRecordStore: Send + Sync {
    async fn find_latest(
        &self,
        email: &str,
        status: Option<ResetStatus>,
    ) -> Result<Option<ResetRecord>, AppError>;

    async fn create(&self, record: NewResetRecord) -> Result<ResetRecord, AppError>;

    async fn update(
        &self,
        id: Uuid,
        seen_updated_at: OffsetDateTime,
        patch: ResetRecordPatch,
    ) -> Result<(), AppError>;

    /// 終端状態への遷移。コード・トークンのハッシュも消去する
    async fn mark_expired(&self, id: Uuid) -> Result<(), AppError>;
}

/// IDストア（アカウント基盤）とのやり取り
///
/// リセットフロー自身はアカウントの認証情報を保持しない。
/// 照会と更新のみをこの境界越しに依頼する。
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Subject>, AppError>;

    /// 新しいパスワードを設定する（ハッシュ化は実装側の責務）
    async fn set_credential(&self, subject_id: Uuid, new_password: &str) -> Result<(), AppError>;
}

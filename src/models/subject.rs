use sqlx::FromRow;
use uuid::Uuid;

/// IDストア上のアカウント参照
///
/// リセットフローが認証情報を変更してよい対象。display_name は
/// 通知メールの宛名にのみ使用する。
#[derive(Debug, Clone, FromRow)]
pub struct Subject {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
}

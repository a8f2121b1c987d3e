use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// リセット試行の状態
///
/// pending → verified → expired の順にのみ遷移し、expired が終端。
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize)]
#[sqlx(type_name = "reset_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ResetStatus {
    Pending,
    Verified,
    Expired,
}

/// パスワードリセットレコード
///
/// メールアドレスごとの進行中リセット試行を1行で追跡する。
/// 過去の行は残るが、参照されるのは常に created_at が最新の行のみ。
/// コードとトークンは平文を保存せず、ハッシュ（PHC文字列）のみDBに置く。
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ResetRecord {
    pub id: Uuid,
    pub email: String,
    pub status: ResetStatus,
    /// pending の間のみ保持。検証成功で消去
    #[serde(skip)]
    pub code_hash: Option<String>,
    pub code_expires_at: Option<OffsetDateTime>,
    /// 検証失敗のたびに減少。0 でコード無効（status は変わらない）
    pub attempts_left: i32,
    pub resend_available_at: OffsetDateTime,
    pub daily_resend_count: i32,
    /// 発行回数を数えるローリングウィンドウの起点
    pub window_started_at: OffsetDateTime,
    /// verified の間のみ保持。消費または期限切れで消去
    #[serde(skip)]
    pub token_hash: Option<String>,
    pub token_expires_at: Option<OffsetDateTime>,
    /// このレコードが認証情報の変更を許可するアカウント
    pub subject_id: Uuid,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// 新規レコードの挿入内容
///
/// status=pending, daily_resend_count=1, ウィンドウ起点=作成時刻 で挿入される
#[derive(Debug, Clone)]
pub struct NewResetRecord {
    pub email: String,
    pub code_hash: String,
    pub code_expires_at: OffsetDateTime,
    pub attempts_left: i32,
    pub resend_available_at: OffsetDateTime,
    pub subject_id: Uuid,
}

/// 可変カラムの更新内容（読み取り時の updated_at を条件に適用する）
#[derive(Debug, Clone)]
pub struct ResetRecordPatch {
    pub status: ResetStatus,
    pub code_hash: Option<String>,
    pub code_expires_at: Option<OffsetDateTime>,
    pub attempts_left: i32,
    pub resend_available_at: OffsetDateTime,
    pub daily_resend_count: i32,
    pub window_started_at: OffsetDateTime,
    pub token_hash: Option<String>,
    pub token_expires_at: Option<OffsetDateTime>,
}

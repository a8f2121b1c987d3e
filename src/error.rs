use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    #[error("データベースエラー")]
    Database(#[from] sqlx::Error),

    #[error("内部エラー")]
    Internal(#[from] anyhow::Error),

    #[error("確認コードが無効または期限切れです")]
    CodeInvalid,

    #[error("無効または期限切れのセッションです")]
    SessionInvalid,

    #[error("リクエストが多すぎます")]
    Cooldown { retry_after_secs: u64 },

    #[error("本日のコード送信回数の上限に達しました")]
    DailyLimitReached,

    #[error("更新が競合しました")]
    Conflict,

    #[error("認証情報の更新に失敗しました")]
    CredentialUpdate,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_secs: Option<u64>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut retry_after_secs = None;

        let (status, message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Database(e) => {
                tracing::error!(error = ?e, "データベースエラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "内部エラーが発生しました".to_string(),
                )
            }
            Self::Internal(e) => {
                tracing::error!(error = ?e, "内部エラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "内部エラーが発生しました".to_string(),
                )
            }
            // 誤り・期限切れ・試行回数超過はすべて同一メッセージに集約（内部原因はログのみ）
            Self::CodeInvalid => (
                StatusCode::BAD_REQUEST,
                "確認コードが無効または期限切れです".to_string(),
            ),
            Self::SessionInvalid => (
                StatusCode::BAD_REQUEST,
                "無効または期限切れのセッションです。最初からやり直してください".to_string(),
            ),
            Self::Cooldown {
                retry_after_secs: wait,
            } => {
                retry_after_secs = Some(*wait);
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    format!("リクエストが多すぎます。{}秒後に再度お試しください", wait),
                )
            }
            Self::DailyLimitReached => (
                StatusCode::TOO_MANY_REQUESTS,
                "本日のコード送信回数の上限に達しました。明日以降に再度お試しください".to_string(),
            ),
            Self::Conflict => (
                StatusCode::CONFLICT,
                "操作が競合しました。再度お試しください".to_string(),
            ),
            Self::CredentialUpdate => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "パスワードの更新に失敗しました。時間をおいて再度お試しください".to_string(),
            ),
        };

        (
            status,
            Json(ErrorResponse {
                error: message,
                retry_after_secs,
            }),
        )
            .into_response()
    }
}

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

// === リセットリクエスト（コード発行） ===

#[derive(Debug, Deserialize)]
pub struct ResetRequestRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ResetRequestResponse {
    pub message: String,
}

/// POST /api/password/reset-request
///
/// # Security
/// アカウントの存在有無に関わらず常に同一の成功応答を返す。
/// 唯一の例外はレート制限（429）
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(request): Json<ResetRequestRequest>,
) -> Result<Json<ResetRequestResponse>, AppError> {
    // バリデーション
    validate_email(&request.email)?;

    state.reset_flow.request_reset(&request.email).await?;

    Ok(Json(ResetRequestResponse {
        message: "パスワード再設定用の確認コードをメールで送信しました".to_string(),
    }))
}

// === コード検証（交換トークン発行） ===

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyCodeResponse {
    pub email: String,
    pub token: String,
    /// トークンの残り有効秒数
    pub expires_in: u64,
}

/// POST /api/password/verify-code
///
/// # Security
/// - 不一致・期限切れ・試行回数超過は同一メッセージ（原因はログのみ）
/// - 返却するトークンはコード所持を証明したこのレスポンスにのみ載せる
pub async fn verify_reset_code(
    State(state): State<AppState>,
    Json(request): Json<VerifyCodeRequest>,
) -> Result<Json<VerifyCodeResponse>, AppError> {
    // バリデーション
    validate_verify_code_request(&request)?;

    let session = state
        .reset_flow
        .verify_code(&request.email, &request.code)
        .await?;

    Ok(Json(VerifyCodeResponse {
        email: session.email,
        token: session.token,
        expires_in: session.expires_in_secs,
    }))
}

// === パスワードリセット確定 ===

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub token: String,
    pub new_password: String, // SecretBox不要（Deserialize後すぐハッシュ化）
}

#[derive(Debug, Serialize)]
pub struct ResetPasswordResponse {
    pub message: String,
}

/// POST /api/password/reset
///
/// # Security
/// - token, new_password はログに出力しない
pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<ResetPasswordResponse>, AppError> {
    // バリデーション
    validate_reset_password_request(&request)?;

    state
        .reset_flow
        .finalize_reset(&request.email, &request.token, &request.new_password)
        .await?;

    Ok(Json(ResetPasswordResponse {
        message: "パスワードが更新されました".to_string(),
    }))
}

/// メールアドレスのバリデーション
fn validate_email(email: &str) -> Result<(), AppError> {
    if email.trim().is_empty() || !email.contains('@') {
        return Err(AppError::Validation(
            "有効なメールアドレスを入力してください".to_string(),
        ));
    }
    Ok(())
}

/// コード検証リクエストのバリデーション
fn validate_verify_code_request(request: &VerifyCodeRequest) -> Result<(), AppError> {
    validate_email(&request.email)?;
    if request.code.len() != 6 || !request.code.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "確認コードは6桁の数字で入力してください".to_string(),
        ));
    }
    Ok(())
}

/// リセット確定リクエストのバリデーション
fn validate_reset_password_request(request: &ResetPasswordRequest) -> Result<(), AppError> {
    validate_email(&request.email)?;
    if request.token.trim().is_empty() {
        return Err(AppError::Validation("トークンは必須です".to_string()));
    }
    if request.new_password.len() < 8 {
        return Err(AppError::Validation(
            "パスワードは8文字以上で入力してください".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_empty_email() {
        let result = validate_email("");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_invalid_email() {
        let result = validate_email("invalid-email");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_valid_email() {
        let result = validate_email("test@example.com");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_code_wrong_length() {
        let request = VerifyCodeRequest {
            email: "test@example.com".to_string(),
            code: "12345".to_string(),
        };
        let result = validate_verify_code_request(&request);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_code_non_digit() {
        let request = VerifyCodeRequest {
            email: "test@example.com".to_string(),
            code: "12a456".to_string(),
        };
        let result = validate_verify_code_request(&request);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_code_keeps_leading_zeros() {
        let request = VerifyCodeRequest {
            email: "test@example.com".to_string(),
            code: "012345".to_string(),
        };
        let result = validate_verify_code_request(&request);
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_empty_token() {
        let request = ResetPasswordRequest {
            email: "test@example.com".to_string(),
            token: "".to_string(),
            new_password: "password123".to_string(),
        };
        let result = validate_reset_password_request(&request);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_short_password() {
        let request = ResetPasswordRequest {
            email: "test@example.com".to_string(),
            token: "valid-token".to_string(),
            new_password: "short".to_string(),
        };
        let result = validate_reset_password_request(&request);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_valid_reset_request() {
        let request = ResetPasswordRequest {
            email: "test@example.com".to_string(),
            token: "valid-token".to_string(),
            new_password: "password123".to_string(),
        };
        let result = validate_reset_password_request(&request);
        assert!(result.is_ok());
    }
}

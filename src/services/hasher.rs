use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use crate::error::AppError;

/// シークレット（確認コード・交換トークン・パスワード）をargon2idでハッシュ化
///
/// 出力はPHC文字列（アルゴリズム名・コストパラメータ・ソルト・導出鍵を含む）。
/// パラメータが保存値に埋め込まれるため、既定コストを後から変更しても
/// 過去のハッシュはそのまま検証できる
pub fn hash_secret(secret: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| {
            tracing::error!(error = ?e, "シークレットハッシュ生成エラー");
            AppError::Internal(anyhow::anyhow!("secret hash error"))
        })?;
    Ok(hash.to_string())
}

/// シークレットを保存済みハッシュと照合
///
/// 保存値に埋め込まれたパラメータで再導出し、定数時間で比較する。
/// 保存値が壊れている場合（フィールド欠落・未知アルゴリズム）は
/// 例外ではなく「不一致」として扱う
pub fn verify_secret(secret: &str, stored: &str) -> bool {
    let parsed = match PasswordHash::new(stored) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::warn!(error = ?e, "保存ハッシュのパースに失敗（不一致として扱う）");
            return false;
        }
    };

    Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok()
}

/// ハッシュ生成をブロッキングプールで実行
///
/// argon2 の導出は意図的に重い（数十〜数百ms）ため、
/// 非同期ワーカースレッドを塞がないよう spawn_blocking に逃がす
pub async fn hash_secret_blocking(secret: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_secret(&secret))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("hash task join error: {e}")))?
}

/// ハッシュ照合をブロッキングプールで実行
pub async fn verify_secret_blocking(secret: String, stored: String) -> bool {
    tokio::task::spawn_blocking(move || verify_secret(&secret, &stored))
        .await
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_round_trip() {
        let hash = hash_secret("483920").unwrap();
        assert!(verify_secret("483920", &hash));
        assert!(!verify_secret("483921", &hash));
    }

    #[test]
    fn test_parameters_embedded_in_stored_form() {
        let hash = hash_secret("483920").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("m="));
        assert!(hash.contains("t="));
        assert!(hash.contains("p="));
    }

    #[test]
    fn test_each_hash_uses_fresh_salt() {
        let a = hash_secret("483920").unwrap();
        let b = hash_secret("483920").unwrap();
        assert_ne!(a, b);
        assert!(verify_secret("483920", &a));
        assert!(verify_secret("483920", &b));
    }

    #[test]
    fn test_malformed_stored_hash_is_mismatch_not_panic() {
        assert!(!verify_secret("483920", ""));
        assert!(!verify_secret("483920", "invalid_hash_format"));
        assert!(!verify_secret("483920", "$argon2id$v=19$broken"));
    }
}

use time::{Duration, OffsetDateTime};

use crate::config::Config;
use crate::error::AppError;
use crate::models::{NewResetRecord, ResetRecordPatch, ResetStatus};
use crate::repositories::{IdentityStore, ResetRecordStore};
use crate::services::email::CodeNotifier;
use crate::services::rate_limit::ResendPolicy;
use crate::services::{hasher, secret};

/// リセットフローのポリシー値一式
///
/// すべて設定値。リクエスト入力からは変更できない
#[derive(Debug, Clone, Copy)]
pub struct ResetPolicy {
    pub code_ttl_secs: i64,
    pub resend_cooldown_secs: i64,
    pub max_verify_attempts: i32,
    pub daily_resend_limit: i32,
    pub token_ttl_secs: i64,
}

impl ResetPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            code_ttl_secs: config.code_ttl_secs,
            resend_cooldown_secs: config.resend_cooldown_secs,
            max_verify_attempts: config.max_verify_attempts,
            daily_resend_limit: config.daily_resend_limit,
            token_ttl_secs: config.token_ttl_secs,
        }
    }

    fn resend(&self) -> ResendPolicy {
        ResendPolicy {
            cooldown_secs: self.resend_cooldown_secs,
            daily_limit: self.daily_resend_limit,
        }
    }
}

/// コード検証成功時に呼び出し元へ返すセッション
///
/// token はここ以外に平文で存在しない。コード所持を証明した
/// クライアントへそのまま返し、メール等で再送してはならない
#[derive(Debug)]
pub struct VerifiedSession {
    pub email: String,
    pub token: String,
    pub expires_in_secs: u64,
}

/// パスワードリセットフロー
///
/// request（コード発行）→ verify（コード検証・トークン発行）→
/// finalize（パスワード設定）の3段階を統括する。
/// メールアドレスごとの状態はすべてレコードストアに置き、
/// プロセス内に共有状態を持たない
#[derive(Clone)]
pub struct ResetFlowService<S, I, N> {
    store: S,
    identity: I,
    notifier: N,
    policy: ResetPolicy,
}

impl<S, I, N> ResetFlowService<S, I, N>
where
    S: ResetRecordStore,
    I: IdentityStore,
    N: CodeNotifier,
{
    /// 新しい ResetFlowService を作成
    pub fn new(store: S, identity: I, notifier: N, policy: ResetPolicy) -> Self {
        Self {
            store,
            identity,
            notifier,
            policy,
        }
    }

    /// ステップ1: 確認コードの発行を要求
    ///
    /// # Security
    /// - アカウントの存在有無を応答から推測させない。不在時も同一の
    ///   成功応答を返し、応答時間を揃えるため同等のハッシュ計算を行う
    /// - ストア・配信の障害も汎用成功に縮退させる（原因はログのみ）。
    ///   唯一の例外はレート制限で、これは存在有無ではなく時間情報しか
    ///   漏らさないため具体的に返す
    pub async fn request_reset(&self, email: &str) -> Result<(), AppError> {
        let email = normalize_email(email);
        let now = OffsetDateTime::now_utc();

        let subject = match self.identity.find_account_by_email(&email).await {
            Ok(subject) => subject,
            Err(e) => {
                tracing::error!(error = %e, "IDストア照会に失敗（汎用応答を返却）");
                return Ok(());
            }
        };

        let Some(subject) = subject else {
            // アカウント不在でも同等のコストを支払ってから成功を返す
            let _ = hasher::hash_secret_blocking(secret::generate_code()).await;
            tracing::info!(email = %email, "リセット要求: アカウント不在（汎用応答返却）");
            return Ok(());
        };

        let pending = match self
            .store
            .find_latest(&email, Some(ResetStatus::Pending))
            .await
        {
            Ok(pending) => pending,
            Err(e) => {
                tracing::error!(error = %e, "リセットレコードの照会に失敗（汎用応答を返却）");
                return Ok(());
            }
        };

        let resend = self.policy.resend();
        if let Some(record) = &pending {
            resend.check(record, now)?;
        }

        let code = secret::generate_code();
        let code_hash = match hasher::hash_secret_blocking(code.clone()).await {
            Ok(hash) => hash,
            Err(e) => {
                tracing::error!(error = %e, "コードハッシュの生成に失敗（汎用応答を返却）");
                return Ok(());
            }
        };

        // 配信成功後にのみ永続化する。届かないコードでクールダウンを
        // 消費させない
        if let Err(e) = self
            .notifier
            .send_code(&email, &code, subject.display_name.as_deref())
            .await
        {
            tracing::error!(error = %e, email = %email, "確認コードの送信に失敗（状態は変更しない）");
            return Ok(());
        }

        match pending {
            Some(record) => {
                let (daily_resend_count, window_started_at) = resend.next_window(&record, now);
                let patch = ResetRecordPatch {
                    status: ResetStatus::Pending,
                    code_hash: Some(code_hash),
                    code_expires_at: Some(now + Duration::seconds(self.policy.code_ttl_secs)),
                    attempts_left: self.policy.max_verify_attempts,
                    resend_available_at: resend.next_resend_available(now),
                    daily_resend_count,
                    window_started_at,
                    token_hash: None,
                    token_expires_at: None,
                };
                match self.store.update(record.id, record.updated_at, patch).await {
                    Ok(()) => {}
                    Err(AppError::Conflict) => {
                        // 同時リクエストが先に発行済み。そちらのコードが有効
                        tracing::warn!(email = %email, "リセット要求が競合（同時リクエスト）");
                        return Ok(());
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "リセットレコードの更新に失敗");
                        return Ok(());
                    }
                }
            }
            None => {
                let new_record = NewResetRecord {
                    email: email.clone(),
                    code_hash,
                    code_expires_at: now + Duration::seconds(self.policy.code_ttl_secs),
                    attempts_left: self.policy.max_verify_attempts,
                    resend_available_at: resend.next_resend_available(now),
                    subject_id: subject.id,
                };
                if let Err(e) = self.store.create(new_record).await {
                    tracing::error!(error = %e, "リセットレコードの作成に失敗");
                    return Ok(());
                }
            }
        }

        tracing::info!(email = %email, "確認コードを発行");

        Ok(())
    }

    /// ステップ2: 確認コードを検証し、交換トークンを発行
    ///
    /// # Security
    /// - 不一致・期限切れ・試行回数超過はすべて同一エラーに集約
    /// - 失敗のたびに attempts_left を減らし、0 になったら正しい
    ///   コードでも受け付けない
    pub async fn verify_code(&self, email: &str, code: &str) -> Result<VerifiedSession, AppError> {
        let email = normalize_email(email);
        let now = OffsetDateTime::now_utc();

        let Some(record) = self
            .store
            .find_latest(&email, Some(ResetStatus::Pending))
            .await?
        else {
            tracing::info!(email = %email, "コード検証失敗: 対象レコードなし");
            return Err(AppError::CodeInvalid);
        };

        if record.code_expires_at.is_none_or(|t| t < now) {
            self.store.mark_expired(record.id).await?;
            tracing::info!(email = %email, "コード検証失敗: 期限切れ");
            return Err(AppError::CodeInvalid);
        }

        if record.attempts_left <= 0 {
            tracing::warn!(email = %email, "コード検証失敗: 試行回数超過");
            return Err(AppError::CodeInvalid);
        }

        let Some(code_hash) = record.code_hash.clone() else {
            tracing::error!(record_id = %record.id, "pending レコードに code_hash がない");
            return Err(AppError::CodeInvalid);
        };

        if !hasher::verify_secret_blocking(code.to_string(), code_hash).await {
            let patch = ResetRecordPatch {
                status: ResetStatus::Pending,
                code_hash: record.code_hash.clone(),
                code_expires_at: record.code_expires_at,
                attempts_left: record.attempts_left - 1,
                resend_available_at: record.resend_available_at,
                daily_resend_count: record.daily_resend_count,
                window_started_at: record.window_started_at,
                token_hash: None,
                token_expires_at: None,
            };
            match self.store.update(record.id, record.updated_at, patch).await {
                // 競合はコードが既に差し替えられたということ。減算は不要
                Ok(()) | Err(AppError::Conflict) => {}
                Err(e) => return Err(e),
            }
            tracing::info!(
                email = %email,
                remaining = record.attempts_left - 1,
                "コード検証失敗: 不一致"
            );
            return Err(AppError::CodeInvalid);
        }

        let token = secret::generate_token();
        let token_hash = hasher::hash_secret_blocking(token.clone()).await?;

        let patch = ResetRecordPatch {
            status: ResetStatus::Verified,
            code_hash: None,
            code_expires_at: None,
            attempts_left: record.attempts_left,
            resend_available_at: record.resend_available_at,
            daily_resend_count: record.daily_resend_count,
            window_started_at: record.window_started_at,
            token_hash: Some(token_hash),
            token_expires_at: Some(now + Duration::seconds(self.policy.token_ttl_secs)),
        };
        match self.store.update(record.id, record.updated_at, patch).await {
            Ok(()) => {}
            Err(AppError::Conflict) => {
                tracing::warn!(email = %email, "コード消費が競合（コードは再発行済み）");
                return Err(AppError::CodeInvalid);
            }
            Err(e) => return Err(e),
        }

        tracing::info!(email = %email, "コード検証成功、交換トークンを発行");

        Ok(VerifiedSession {
            email,
            token,
            expires_in_secs: self.policy.token_ttl_secs.max(0) as u64,
        })
    }

    /// ステップ3: 交換トークンを検証し、新しいパスワードを設定
    ///
    /// # Security
    /// - トークン不一致ではレコードを変更しない。トークンは高エントロピーで
    ///   推測不能なため、コードと違い試行回数制限を設けない
    /// - 認証情報の更新失敗時はレコードを verified のまま残し、
    ///   ステップ1からやり直さずに再試行できるようにする
    pub async fn finalize_reset(
        &self,
        email: &str,
        token: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        // ストアに触れる前に安価な検査で弾く
        validate_new_password(new_password)?;

        let email = normalize_email(email);
        let now = OffsetDateTime::now_utc();

        let Some(record) = self
            .store
            .find_latest(&email, Some(ResetStatus::Verified))
            .await?
        else {
            tracing::info!(email = %email, "リセット確定失敗: 対象セッションなし");
            return Err(AppError::SessionInvalid);
        };

        if record.token_expires_at.is_none_or(|t| t < now) {
            self.store.mark_expired(record.id).await?;
            tracing::info!(email = %email, "リセット確定失敗: セッション期限切れ");
            return Err(AppError::SessionInvalid);
        }

        let Some(token_hash) = record.token_hash.clone() else {
            tracing::error!(record_id = %record.id, "verified レコードに token_hash がない");
            return Err(AppError::SessionInvalid);
        };

        if !hasher::verify_secret_blocking(token.to_string(), token_hash).await {
            tracing::warn!(email = %email, "リセット確定失敗: トークン不一致");
            return Err(AppError::SessionInvalid);
        }

        if let Err(e) = self
            .identity
            .set_credential(record.subject_id, new_password)
            .await
        {
            tracing::error!(
                error = %e,
                subject_id = %record.subject_id,
                "認証情報の更新に失敗（セッションは再試行可能なまま残す）"
            );
            return Err(AppError::CredentialUpdate);
        }

        // トークンを消費して終端へ。以後このレコードは再利用できない
        self.store.mark_expired(record.id).await?;

        tracing::info!(subject_id = %record.subject_id, "パスワードリセット完了");

        Ok(())
    }
}

/// メールアドレスの正規化（前後空白の除去と小文字化）
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// 新しいパスワードのポリシー検査
fn validate_new_password(password: &str) -> Result<(), AppError> {
    if password.len() < 8 {
        return Err(AppError::Validation(
            "パスワードは8文字以上で入力してください".to_string(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_alphabetic())
        || !password.chars().any(|c| c.is_ascii_digit())
    {
        return Err(AppError::Validation(
            "パスワードには英字と数字を含めてください".to_string(),
        ));
    }
    Ok(())
}

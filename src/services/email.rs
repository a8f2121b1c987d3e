use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::AppError;

/// 確認コードの配信チャネル
///
/// 配信失敗はそのまま返すこと。呼び出し側は配信が成功するまで
/// レコードを確定しない
#[async_trait]
pub trait CodeNotifier: Send + Sync {
    async fn send_code(
        &self,
        to: &str,
        code: &str,
        display_name: Option<&str>,
    ) -> Result<(), AppError>;
}

/// メール送信サービス（開発環境: スタブ実装）
#[derive(Clone)]
pub struct EmailService {
    config: Arc<Config>,
}

impl EmailService {
    /// 新しい EmailService を作成
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// 開発モードの配信代替（ログ出力）
    fn log_delivery(&self, to: &str, code: &str) {
        tracing::info!(to = %to, "確認コード送信（開発モード）");
        tracing::info!("確認コード: {}", code);
    }

    /// lettre による SMTP 送信（email 機能有効時のみ）
    #[cfg(feature = "email")]
    async fn send_via_smtp(
        &self,
        to: &str,
        code: &str,
        display_name: Option<&str>,
    ) -> Result<(), AppError> {
        use lettre::message::Mailbox;
        use lettre::transport::smtp::authentication::Credentials;
        use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
        use secrecy::ExposeSecret;

        let (Some(host), Some(username), Some(password), Some(from)) = (
            self.config.smtp_host.as_deref(),
            self.config.smtp_username.as_ref(),
            self.config.smtp_password.as_ref(),
            self.config.smtp_from_address.as_deref(),
        ) else {
            tracing::warn!("SMTP設定が不完全（ログ出力のみ）");
            self.log_delivery(to, code);
            return Ok(());
        };

        let from_mailbox: Mailbox = from
            .parse()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid from address: {e}")))?;
        let to_mailbox: Mailbox = to
            .parse()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid to address: {e}")))?;

        let greeting = display_name.unwrap_or("ご利用者");
        let body = format!(
            "{} 様\n\nパスワード再設定用の確認コードは {} です。\n有効期限内に画面へ入力してください。\n心当たりがない場合はこのメールを破棄してください。\n",
            greeting, code
        );

        let message = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject("パスワード再設定用の確認コード")
            .body(body)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to build email: {e}")))?;

        let mailer: AsyncSmtpTransport<Tokio1Executor> =
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .map_err(|e| AppError::Internal(anyhow::anyhow!("smtp relay error: {e}")))?
                .port(self.config.smtp_port)
                .credentials(Credentials::new(
                    username.expose_secret().clone(),
                    password.expose_secret().clone(),
                ))
                .build();

        mailer
            .send(message)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("smtp send error: {e}")))?;

        tracing::info!(to = %to, "確認コードメール送信完了");

        Ok(())
    }

    #[cfg(feature = "email")]
    async fn deliver(
        &self,
        to: &str,
        code: &str,
        display_name: Option<&str>,
    ) -> Result<(), AppError> {
        self.send_via_smtp(to, code, display_name).await
    }

    #[cfg(not(feature = "email"))]
    async fn deliver(
        &self,
        to: &str,
        code: &str,
        _display_name: Option<&str>,
    ) -> Result<(), AppError> {
        self.log_delivery(to, code);
        Ok(())
    }
}

#[async_trait]
impl CodeNotifier for EmailService {
    async fn send_code(
        &self,
        to: &str,
        code: &str,
        display_name: Option<&str>,
    ) -> Result<(), AppError> {
        self.deliver(to, code, display_name).await
    }
}

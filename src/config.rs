use secrecy::SecretBox;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub database_url: SecretBox<String>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    // SMTP設定（オプション - email機能有効時のみ使用）
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_username: Option<SecretBox<String>>,
    pub smtp_password: Option<SecretBox<String>>,
    #[serde(default)]
    pub smtp_from_address: Option<String>,

    // パスワードリセットポリシー（固定の設定値。リクエスト入力では変更できない）
    /// 確認コードの有効期間（秒）
    #[serde(default = "default_code_ttl_secs")]
    pub code_ttl_secs: i64,
    /// コード再送までのクールダウン（秒）
    #[serde(default = "default_resend_cooldown_secs")]
    pub resend_cooldown_secs: i64,
    /// 1コードあたりの検証試行回数の上限
    #[serde(default = "default_max_verify_attempts")]
    pub max_verify_attempts: i32,
    /// 24時間ウィンドウ内のコード発行回数の上限
    #[serde(default = "default_daily_resend_limit")]
    pub daily_resend_limit: i32,
    /// 交換トークンの有効期間（秒）
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: i64,
}

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_CODE_TTL_SECS: i64 = 600;
const DEFAULT_RESEND_COOLDOWN_SECS: i64 = 60;
const DEFAULT_MAX_VERIFY_ATTEMPTS: i32 = 3;
const DEFAULT_DAILY_RESEND_LIMIT: i32 = 5;
const DEFAULT_TOKEN_TTL_SECS: i64 = 900;

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

fn default_code_ttl_secs() -> i64 {
    DEFAULT_CODE_TTL_SECS
}

fn default_resend_cooldown_secs() -> i64 {
    DEFAULT_RESEND_COOLDOWN_SECS
}

fn default_max_verify_attempts() -> i32 {
    DEFAULT_MAX_VERIFY_ATTEMPTS
}

fn default_daily_resend_limit() -> i32 {
    DEFAULT_DAILY_RESEND_LIMIT
}

fn default_token_ttl_secs() -> i64 {
    DEFAULT_TOKEN_TTL_SECS
}

impl Config {
    pub fn load() -> Result<Self, envy::Error> {
        envy::from_env()
    }
}

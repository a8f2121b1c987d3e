use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::repositories::{IdentityRepository, ResetRecordRepository};
use crate::services::{EmailService, ResetFlowService, ResetPolicy};

/// 本番構成のリセットフロー型
pub type AppResetFlow = ResetFlowService<ResetRecordRepository, IdentityRepository, EmailService>;

/// アプリケーション共有状態
///
/// axum の State として全ハンドラーで共有される。
/// Clone は必須（axum が内部で clone するため）。
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL コネクションプール
    pub db_pool: PgPool,
    /// アプリケーション設定（Arc で共有）
    pub config: Arc<Config>,
    /// パスワードリセットフロー
    pub reset_flow: AppResetFlow,
}

impl AppState {
    /// 新しい AppState を作成
    pub fn new(db_pool: PgPool, config: Config) -> Self {
        let config = Arc::new(config);
        let store = ResetRecordRepository::new(db_pool.clone());
        let identity = IdentityRepository::new(db_pool.clone());
        let email_service = EmailService::new(config.clone());
        let reset_flow = ResetFlowService::new(
            store,
            identity,
            email_service,
            ResetPolicy::from_config(&config),
        );

        Self {
            db_pool,
            config,
            reset_flow,
        }
    }
}

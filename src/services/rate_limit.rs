use time::{Duration, OffsetDateTime};

use crate::error::AppError;
use crate::models::ResetRecord;

/// コード発行回数を集計するローリングウィンドウ長
pub const RESEND_WINDOW: Duration = Duration::hours(24);

/// コード再発行の可否を判定するポリシー
///
/// 既存の pending レコードに対して、シークレット生成・永続化の前に評価する。
/// どちらかの判定で拒否された場合、レコードは一切変更されない
#[derive(Debug, Clone, Copy)]
pub struct ResendPolicy {
    pub cooldown_secs: i64,
    pub daily_limit: i32,
}

impl ResendPolicy {
    /// 再発行を許可するか判定
    ///
    /// 上限判定はクールダウンと独立。上限に達したメールアドレスは
    /// クールダウンが明けてもウィンドウが閉じるまで拒否される
    pub fn check(&self, record: &ResetRecord, now: OffsetDateTime) -> Result<(), AppError> {
        let window_open = now < record.window_started_at + RESEND_WINDOW;
        if window_open && record.daily_resend_count >= self.daily_limit {
            return Err(AppError::DailyLimitReached);
        }

        if now < record.resend_available_at {
            let wait = (record.resend_available_at - now).whole_seconds().max(1) as u64;
            return Err(AppError::Cooldown {
                retry_after_secs: wait,
            });
        }

        Ok(())
    }

    /// 次に再送を受け付ける時刻
    pub fn next_resend_available(&self, now: OffsetDateTime) -> OffsetDateTime {
        now + Duration::seconds(self.cooldown_secs)
    }

    /// 次のコード発行後のカウンタ値とウィンドウ起点
    ///
    /// ウィンドウが経過していればカウンタを1に戻し、起点を現在に移す
    pub fn next_window(&self, record: &ResetRecord, now: OffsetDateTime) -> (i32, OffsetDateTime) {
        if now >= record.window_started_at + RESEND_WINDOW {
            (1, now)
        } else {
            (record.daily_resend_count + 1, record.window_started_at)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResetStatus;
    use uuid::Uuid;

    fn policy() -> ResendPolicy {
        ResendPolicy {
            cooldown_secs: 60,
            daily_limit: 5,
        }
    }

    fn record(
        resend_available_at: OffsetDateTime,
        daily_resend_count: i32,
        window_started_at: OffsetDateTime,
    ) -> ResetRecord {
        let now = OffsetDateTime::now_utc();
        ResetRecord {
            id: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            status: ResetStatus::Pending,
            code_hash: Some("$argon2id$dummy".to_string()),
            code_expires_at: Some(now + Duration::minutes(10)),
            attempts_left: 3,
            resend_available_at,
            daily_resend_count,
            window_started_at,
            token_hash: None,
            token_expires_at: None,
            subject_id: Uuid::new_v4(),
            created_at: window_started_at,
            updated_at: now,
        }
    }

    #[test]
    fn test_cooldown_rejects_with_remaining_wait() {
        let now = OffsetDateTime::now_utc();
        let rec = record(now + Duration::seconds(30), 1, now);

        match policy().check(&rec, now) {
            Err(AppError::Cooldown { retry_after_secs }) => {
                assert!(retry_after_secs >= 1);
                assert!(retry_after_secs <= 60);
            }
            other => panic!("expected cooldown rejection, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_resend_allowed_after_cooldown() {
        let now = OffsetDateTime::now_utc();
        let rec = record(now - Duration::seconds(1), 1, now - Duration::minutes(5));

        assert!(policy().check(&rec, now).is_ok());
    }

    #[test]
    fn test_daily_limit_rejects_inside_window() {
        let now = OffsetDateTime::now_utc();
        let rec = record(now - Duration::seconds(1), 5, now - Duration::hours(1));

        assert!(matches!(
            policy().check(&rec, now),
            Err(AppError::DailyLimitReached)
        ));
    }

    #[test]
    fn test_daily_limit_wins_over_cooldown() {
        let now = OffsetDateTime::now_utc();
        let rec = record(now + Duration::seconds(30), 5, now - Duration::hours(1));

        assert!(matches!(
            policy().check(&rec, now),
            Err(AppError::DailyLimitReached)
        ));
    }

    #[test]
    fn test_daily_limit_resets_after_window() {
        let now = OffsetDateTime::now_utc();
        let rec = record(now - Duration::seconds(1), 5, now - Duration::hours(25));

        assert!(policy().check(&rec, now).is_ok());
        assert_eq!(policy().next_window(&rec, now), (1, now));
    }

    #[test]
    fn test_count_increments_inside_window() {
        let now = OffsetDateTime::now_utc();
        let started = now - Duration::hours(1);
        let rec = record(now - Duration::seconds(1), 2, started);

        assert_eq!(policy().next_window(&rec, now), (3, started));
    }
}

//! Retention - 保持期間とスイープ結果
//!
//! cutoff の計算は純粋関数として切り出し、時刻は呼び出し側（Clock）から渡します。

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// RetentionPolicy はレポートの最大保持日数
///
/// # cutoff の定義
/// - `cutoff = now - max_age_days 日`
/// - `created_at <= cutoff` のレコードが削除対象（境界を含む）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    max_age_days: u32,
}

impl RetentionPolicy {
    /// 設定で受け付ける保持日数の上限（約 100 年）
    pub const MAX_AGE_DAYS: u32 = 36_500;

    pub fn new(max_age_days: u32) -> Self {
        Self { max_age_days }
    }

    pub fn max_age_days(&self) -> u32 {
        self.max_age_days
    }

    /// now から保持日数を引いた閾値
    ///
    /// 表現できる範囲を下回る場合は `DateTime::<Utc>::MIN_UTC`（何も削除しない）
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(Duration::days(i64::from(self.max_age_days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// SweepReport は 1 回のスイープの結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub cutoff: DateTime<Utc>,
    /// list_older_than が返した件数
    pub matched: usize,
    /// soft delete できた件数
    pub deleted: usize,
    pub files_removed: usize,
    /// 削除に失敗した（または既に無かった）ファイルの件数
    pub files_failed: usize,
}

impl SweepReport {
    pub fn empty(cutoff: DateTime<Utc>) -> Self {
        Self {
            cutoff,
            matched: 0,
            deleted: 0,
            files_removed: 0,
            files_failed: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn cutoff_subtracts_whole_days() {
        let policy = RetentionPolicy::new(7);
        assert_eq!(policy.cutoff(at(2024, 1, 10)), at(2024, 1, 3));
    }

    #[test]
    fn cutoff_crosses_month_boundary() {
        let policy = RetentionPolicy::new(30);
        assert_eq!(policy.cutoff(at(2024, 3, 1)), at(2024, 1, 31));
    }

    #[rstest]
    #[case::older(at(2024, 1, 1), true)]
    #[case::exactly_at_cutoff(at(2024, 1, 3), true)]
    #[case::newer(at(2024, 1, 5), false)]
    fn expiry_includes_the_cutoff_instant(#[case] created_at: DateTime<Utc>, #[case] expired: bool) {
        let cutoff = RetentionPolicy::new(7).cutoff(at(2024, 1, 10));
        assert_eq!(created_at <= cutoff, expired);
    }

    #[test]
    fn zero_days_means_up_to_now() {
        let now = at(2024, 1, 10);
        assert_eq!(RetentionPolicy::new(0).cutoff(now), now);
    }

    #[rstest]
    #[case::far_beyond_range(100_000_000)]
    #[case::u32_max(u32::MAX)]
    fn out_of_range_cutoff_clamps_instead_of_panicking(#[case] days: u32) {
        let cutoff = RetentionPolicy::new(days).cutoff(at(2024, 1, 10));
        assert_eq!(cutoff, DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn max_configurable_age_stays_in_range() {
        let now = at(2024, 1, 10);
        let cutoff = RetentionPolicy::new(RetentionPolicy::MAX_AGE_DAYS).cutoff(now);
        assert!(cutoff > DateTime::<Utc>::MIN_UTC);
        assert!(cutoff < now);
    }
}

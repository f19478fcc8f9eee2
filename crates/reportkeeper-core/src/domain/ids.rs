//! Ids - 型付き ID
//!
//! report_history の id は SQLite の AUTOINCREMENT で採番されるため、
//! ULID ではなく i64 をそのまま newtype で包みます。
//!
//! ## newtype にする理由
//! - 生の i64（limit/offset/file_size など）と混同できない
//! - Display で `report-` プレフィックスを付けてログを読みやすくする

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Display で使うプレフィックス
const PREFIX: &str = "report-";

/// ReportId はレポート履歴の id
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(i64);

impl ReportId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// 内部の値を取得（SQL パラメータ用）
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for ReportId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PREFIX}{}", self.0)
    }
}

/// ParseReportIdError は文字列から ReportId への変換失敗
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid report id: {0:?}")]
pub struct ParseReportIdError(String);

impl FromStr for ReportId {
    type Err = ParseReportIdError;

    /// `42` と `report-42` の両方を受け付ける
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let digits = raw.strip_prefix(PREFIX).unwrap_or(raw);
        digits
            .parse::<i64>()
            .map(ReportId)
            .map_err(|_| ParseReportIdError(s.to_string()))
    }
}

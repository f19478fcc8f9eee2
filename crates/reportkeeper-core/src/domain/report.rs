//! Report - レポート履歴のレコード

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::ReportId;

/// 観測値の集計（最大・最小・平均）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSummary {
    pub max_value: f64,
    pub min_value: f64,
    pub average: f64,
}

/// 重要度別のアラート件数と、チェックしたメトリクスの総数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertCounts {
    pub alert_count: i64,
    pub critical_count: i64,
    pub warning_count: i64,
    pub total_count: i64,
}

/// ReportRecord は履歴テーブルに保存されたレポート
///
/// 読み取りクエリが返すレコードは常に `deleted_at == None`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub id: ReportId,
    pub created_at: DateTime<Utc>,
    pub project: String,
    pub datasource: String,

    /// reports ディレクトリからの相対パス
    pub report_path: String,

    pub task_id: Option<String>,

    /// 生成にかかった秒数
    pub task_time: Option<i64>,

    /// ファイルサイズ（バイト）
    pub file_size: Option<i64>,

    #[serde(flatten)]
    pub summary: ReportSummary,

    #[serde(flatten)]
    pub counts: AlertCounts,

    /// soft delete の時刻
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ReportRecord {
    /// NewReport から保存形式を作る（インメモリストア用）
    pub fn from_new(id: ReportId, report: NewReport) -> Self {
        Self {
            id,
            created_at: report.created_at,
            project: report.project,
            datasource: report.datasource,
            report_path: report.report_path,
            task_id: report.task_id,
            task_time: report.task_time,
            file_size: report.file_size,
            summary: report.summary,
            counts: report.counts,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// スイープに必要な列だけを取り出す
    pub fn to_expired(&self) -> ExpiredReport {
        ExpiredReport {
            id: self.id,
            report_path: self.report_path.clone(),
            created_at: self.created_at,
        }
    }
}

/// NewReport は挿入時の形（id と削除時刻はストアが管理）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReport {
    pub created_at: DateTime<Utc>,
    pub project: String,
    pub datasource: String,
    pub report_path: String,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub task_time: Option<i64>,
    #[serde(default)]
    pub file_size: Option<i64>,
    #[serde(flatten)]
    pub summary: ReportSummary,
    #[serde(flatten)]
    pub counts: AlertCounts,
}

impl NewReport {
    /// 集計値がすべて 0 の最小限のレポート
    pub fn new(
        created_at: DateTime<Utc>,
        project: impl Into<String>,
        datasource: impl Into<String>,
        report_path: impl Into<String>,
    ) -> Self {
        Self {
            created_at,
            project: project.into(),
            datasource: datasource.into(),
            report_path: report_path.into(),
            task_id: None,
            task_time: None,
            file_size: None,
            summary: ReportSummary::default(),
            counts: AlertCounts::default(),
        }
    }
}

/// ExpiredReport はスイープ対象の `{id, path, created_at}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiredReport {
    pub id: ReportId,
    pub report_path: String,
    pub created_at: DateTime<Utc>,
}

/// Page は一覧取得のページング（新しい順）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Page {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 500;

    /// limit を 1..=MAX_LIMIT に丸める
    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: limit.clamp(1, Self::MAX_LIMIT),
            offset,
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LIMIT, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[rstest]
    #[case::zero(0, 1)]
    #[case::normal(50, 50)]
    #[case::too_large(10_000, Page::MAX_LIMIT)]
    fn page_limit_is_clamped(#[case] requested: u32, #[case] expected: u32) {
        assert_eq!(Page::new(requested, 3).limit, expected);
    }

    #[test]
    fn new_report_json_uses_flat_statistics() {
        let created_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let json = serde_json::json!({
            "created_at": created_at,
            "project": "shop",
            "datasource": "prod-prometheus",
            "report_path": "shop/2024-01-01.html",
            "max_value": 91.5,
            "min_value": 1.0,
            "average": 40.25,
            "alert_count": 3,
            "critical_count": 1,
            "warning_count": 2,
            "total_count": 120
        });

        let report: NewReport = serde_json::from_value(json).unwrap();
        assert_eq!(report.summary.max_value, 91.5);
        assert_eq!(report.counts.total_count, 120);
        assert_eq!(report.task_id, None);
    }

    #[test]
    fn from_new_starts_undeleted() {
        let created_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let record = ReportRecord::from_new(
            ReportId::new(1),
            NewReport::new(created_at, "shop", "prom", "a.html"),
        );
        assert!(!record.is_deleted());
        assert_eq!(record.to_expired().report_path, "a.html");
    }
}

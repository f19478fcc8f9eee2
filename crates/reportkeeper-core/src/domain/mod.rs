//! Domain - ドメインモデル（ID、レポート履歴、保持期間、エラー）

pub mod errors;
pub mod ids;
pub mod metrics;
pub mod report;
pub mod retention;

pub use self::errors::{
    ArtifactError, ConfigError, HistoryError, MetricsError, StoreError, SweepError,
};
pub use self::ids::{ParseReportIdError, ReportId};
pub use self::metrics::Sample;
pub use self::report::{AlertCounts, ExpiredReport, NewReport, Page, ReportRecord, ReportSummary};
pub use self::retention::{RetentionPolicy, SweepReport};

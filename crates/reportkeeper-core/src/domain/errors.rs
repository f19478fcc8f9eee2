//! Errors - エラー型と分類
//!
//! # 分類
//! - StoreError: history store の失敗（スイープを中断して呼び出し元へ返す）
//! - ArtifactError: ファイル削除の失敗（スイープではログに残して無視）
//! - SweepError: スイープ全体の失敗（どこまで処理したかを含む）
//! - HistoryError / MetricsError / ConfigError: 周辺機能のエラー

use std::path::PathBuf;

use thiserror::Error;

use super::ids::ReportId;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("report not found: {0}")]
    NotFound(ReportId),

    #[error("failed to prepare {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// テスト用ストアが注入する失敗など
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("artifact path escapes the reports directory: {0:?}")]
    OutsideRoot(String),

    #[error("failed to remove {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("failed to list expired reports: {0}")]
    List(#[source] StoreError),

    #[error("failed to mark {id} deleted after {processed} processed: {source}")]
    MarkDeleted {
        id: ReportId,
        /// 中断までに処理し終えた件数
        processed: usize,
        #[source]
        source: StoreError,
    },
}

impl SweepError {
    /// 中断までに処理し終えた件数
    pub fn processed(&self) -> usize {
        match self {
            SweepError::List(_) => 0,
            SweepError::MarkDeleted { processed, .. } => *processed,
        }
    }
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("invalid report: {0}")]
    Invalid(String),

    #[error("report not found: {0}")]
    NotFound(ReportId),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for HistoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => HistoryError::NotFound(id),
            other => HistoryError::Store(other),
        }
    }
}

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("metrics backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("metrics backend returned {error_type}: {error}")]
    Api { error_type: String, error: String },

    #[error("invalid metrics backend url: {0:?}")]
    InvalidUrl(String),

    #[error("unexpected metrics response: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

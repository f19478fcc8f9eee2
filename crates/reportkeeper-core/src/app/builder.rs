//! AppBuilder - 設定からアプリケーションを組み立てる
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::domain::{ConfigError, MetricsError, RetentionPolicy, StoreError};
use crate::impls::{LocalArtifactStore, PrometheusClient, SqliteHistoryStore};
use crate::ports::{ArtifactStore, Clock, HistoryStore, SystemClock};

use super::history::ReportHistory;
use super::retention_loop::RetentionLoop;
use super::sweeper::RetentionSweeper;

/// AppBuilder は AppConfig から App を構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new(AppConfig::load_or_default("config.toml")?)
///     .max_age_days(Some(14))
///     .build()?;
/// let report = app.sweeper.sweep_once().await?;
/// ```
///
/// # Fail-fast 設計
/// - build() 時に保持期間と間隔を検証
/// - DB が開けなければここで失敗する
pub struct AppBuilder {
    config: AppConfig,
    clock: Option<Arc<dyn Clock>>,
}

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to open report history: {0}")]
    Store(#[from] StoreError),
}

impl AppBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            clock: None,
        }
    }

    /// CLI の `--max-age-days` で設定ファイルの値を上書き
    pub fn max_age_days(mut self, days: Option<u32>) -> Self {
        if let Some(days) = days {
            self.config.retention.max_age_days = days;
        }
        self
    }

    /// CLI の `--interval-secs` で設定ファイルの値を上書き
    pub fn interval_secs(mut self, secs: Option<u64>) -> Self {
        if let Some(secs) = secs {
            self.config.retention.interval_secs = secs;
        }
        self
    }

    /// テスト用: 時刻を差し替える（デフォルトは SystemClock）
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<App, BuildError> {
        self.config.validate()?;

        let store: Arc<dyn HistoryStore> =
            Arc::new(SqliteHistoryStore::open(&self.config.database_path)?);
        let artifacts: Arc<dyn ArtifactStore> =
            Arc::new(LocalArtifactStore::new(&self.config.reports_dir));
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);

        let sweeper = Arc::new(RetentionSweeper::new(
            Arc::clone(&store),
            Arc::clone(&artifacts),
            Arc::clone(&clock),
            RetentionPolicy::new(self.config.retention.max_age_days),
        ));
        let history = ReportHistory::new(store, artifacts, clock);

        Ok(App {
            config: self.config,
            history,
            sweeper,
        })
    }
}

/// App は組み立て済みのコンポーネント一式
pub struct App {
    pub config: AppConfig,
    pub history: ReportHistory,
    pub sweeper: Arc<RetentionSweeper>,
}

impl App {
    pub fn retention_loop(&self) -> RetentionLoop {
        RetentionLoop::new(
            Arc::clone(&self.sweeper),
            Duration::from_secs(self.config.retention.interval_secs),
        )
    }

    pub fn metrics_client(&self) -> Result<PrometheusClient, MetricsError> {
        let prometheus = &self.config.prometheus;
        PrometheusClient::new(&prometheus.url, &prometheus.username, &prometheus.password)
    }
}

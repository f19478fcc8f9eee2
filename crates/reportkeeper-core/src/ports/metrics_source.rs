//! MetricsSource port - メトリクスバックエンド（Prometheus 互換）
//!
//! # 実装
//! - **PrometheusClient**: HTTP API `/api/v1/query`

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{MetricsError, Sample};

/// MetricsSource は instant query を実行する
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// `at` が None のときはバックエンド側の現在時刻で評価される
    async fn query(
        &self,
        promql: &str,
        at: Option<DateTime<Utc>>,
    ) -> Result<Vec<Sample>, MetricsError>;
}

//! Metrics - メトリクスバックエンドから取得したサンプル

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Sample は instant query の 1 系列分の値
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    /// `__name__` を含むラベル集合
    pub labels: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Sample {
    pub fn metric_name(&self) -> Option<&str> {
        self.labels.get("__name__").map(String::as_str)
    }
}

//! PrometheusClient - Prometheus HTTP API のクライアント
//!
//! # 実装詳細
//! - `GET {url}/api/v1/query` の instant query のみ
//! - username と password の両方が空でないときだけ Basic 認証を付ける
//! - レスポンスの解析は `parse_query_response` に分離（ネットワーク無しでテストできる）

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::domain::{MetricsError, Sample};
use crate::ports::MetricsSource;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Basic 認証の資格情報
#[derive(Clone)]
struct BasicAuth {
    username: String,
    password: String,
}

/// PrometheusClient は MetricsSource の HTTP 実装
#[derive(Clone)]
pub struct PrometheusClient {
    http: reqwest::Client,
    base_url: String,
    auth: Option<BasicAuth>,
}

impl PrometheusClient {
    pub fn new(url: &str, username: &str, password: &str) -> Result<Self, MetricsError> {
        let base_url = url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(MetricsError::InvalidUrl(url.to_string()));
        }

        let auth = (!username.is_empty() && !password.is_empty()).then(|| BasicAuth {
            username: username.to_string(),
            password: password.to_string(),
        });

        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            http,
            base_url,
            auth,
        })
    }

    pub fn has_auth(&self) -> bool {
        self.auth.is_some()
    }

    pub fn query_url(&self) -> String {
        format!("{}/api/v1/query", self.base_url)
    }
}

#[async_trait]
impl MetricsSource for PrometheusClient {
    async fn query(
        &self,
        promql: &str,
        at: Option<DateTime<Utc>>,
    ) -> Result<Vec<Sample>, MetricsError> {
        let mut params = vec![("query", promql.to_string())];
        if let Some(at) = at {
            params.push(("time", format_timestamp(at)));
        }

        let mut request = self.http.get(self.query_url()).query(&params);
        if let Some(auth) = &self.auth {
            request = request.basic_auth(&auth.username, Some(&auth.password));
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(%status, promql, "prometheus query answered");

        // エラー時も Prometheus は JSON を返すので、まず本文を解析する
        parse_query_response(&body).map_err(|err| match err {
            MetricsError::Decode(msg) if !status.is_success() => {
                MetricsError::Decode(format!("HTTP {status}: {msg}"))
            }
            other => other,
        })
    }
}

/// Prometheus は unix 秒（小数可）を受け付ける
fn format_timestamp(at: DateTime<Utc>) -> String {
    format!("{:.3}", at.timestamp_millis() as f64 / 1000.0)
}

#[derive(Deserialize)]
struct ApiResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(rename = "errorType", default)]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
#[serde(tag = "resultType", content = "result", rename_all = "lowercase")]
enum QueryData {
    Vector(Vec<VectorSample>),
    Scalar(RawValue),
    Matrix(serde_json::Value),
    String(serde_json::Value),
}

#[derive(Deserialize)]
struct VectorSample {
    #[serde(default)]
    metric: BTreeMap<String, String>,
    value: RawValue,
}

/// `[<unix 秒>, "<値>"]`
#[derive(Deserialize)]
struct RawValue(f64, String);

impl RawValue {
    fn into_sample(self, labels: BTreeMap<String, String>) -> Result<Sample, MetricsError> {
        let RawValue(ts, raw) = self;
        let value = raw
            .parse::<f64>()
            .map_err(|_| MetricsError::Decode(format!("sample value {raw:?} is not a number")))?;
        let timestamp = DateTime::from_timestamp_millis((ts * 1000.0).round() as i64)
            .ok_or_else(|| MetricsError::Decode(format!("sample timestamp {ts} out of range")))?;
        Ok(Sample {
            labels,
            timestamp,
            value,
        })
    }
}

/// `/api/v1/query` のレスポンス本文を Sample に変換
pub fn parse_query_response(body: &str) -> Result<Vec<Sample>, MetricsError> {
    let response: ApiResponse =
        serde_json::from_str(body).map_err(|e| MetricsError::Decode(e.to_string()))?;

    if response.status != "success" {
        return Err(MetricsError::Api {
            error_type: response.error_type.unwrap_or_else(|| "unknown".to_string()),
            error: response.error.unwrap_or_default(),
        });
    }

    match response.data {
        Some(QueryData::Vector(samples)) => samples
            .into_iter()
            .map(|s| s.value.into_sample(s.metric))
            .collect(),
        Some(QueryData::Scalar(value)) => Ok(vec![value.into_sample(BTreeMap::new())?]),
        Some(QueryData::Matrix(_)) => Err(MetricsError::Decode(
            "matrix results are not supported by instant queries".to_string(),
        )),
        Some(QueryData::String(_)) => Err(MetricsError::Decode(
            "string results are not supported".to_string(),
        )),
        None => Err(MetricsError::Decode("missing data".to_string())),
    }
}

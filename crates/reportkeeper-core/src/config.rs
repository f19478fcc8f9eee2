//! Config - TOML 設定ファイル
//!
//! すべての項目にデフォルト値があり、ファイルが無い場合もデフォルトで動きます。

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{ConfigError, RetentionPolicy};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// レポートファイルの置き場。DB の report_path はここからの相対パス
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub prometheus: PrometheusConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,
    /// watch モードでのスイープ間隔（秒）
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrometheusConfig {
    #[serde(default = "default_prometheus_url")]
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data/sqlite.db")
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}

fn default_max_age_days() -> u32 {
    7
}

fn default_interval_secs() -> u64 {
    86_400
}

fn default_prometheus_url() -> String {
    "http://localhost:9090".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            reports_dir: default_reports_dir(),
            retention: RetentionConfig::default(),
            prometheus: PrometheusConfig::default(),
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_age_days: default_max_age_days(),
            interval_secs: default_interval_secs(),
        }
    }
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            url: default_prometheus_url(),
            username: String::new(),
            password: String::new(),
        }
    }
}

impl AppConfig {
    /// ファイルを読み込んで検証する
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// ファイルが無ければデフォルト値を使う
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(path = %path.display(), "config file not found, using defaults");
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        Self::load(path)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retention.validate()
    }
}

impl RetentionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_age_days == 0 {
            return Err(ConfigError::Invalid(
                "retention.max_age_days must be >= 1".to_string(),
            ));
        }
        if self.max_age_days > RetentionPolicy::MAX_AGE_DAYS {
            return Err(ConfigError::Invalid(format!(
                "retention.max_age_days must be <= {}",
                RetentionPolicy::MAX_AGE_DAYS
            )));
        }
        if self.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "retention.interval_secs must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

//! Ports - 抽象化レイヤー
//!
//! 各 trait は外部システム（SQLite, ファイルシステム, Prometheus）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - SQLite の report_history が正本（source of truth）
//! - レポートファイルは reports ディレクトリに置かれ、DB は相対パスだけを持つ
//! - 時刻は Clock から取る（テストでは FixedClock）

pub mod artifact_store;
pub mod clock;
pub mod history_store;
pub mod metrics_source;

// 主要な trait を再エクスポート
pub use self::artifact_store::ArtifactStore;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::history_store::HistoryStore;
pub use self::metrics_source::MetricsSource;

//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **SqliteHistoryStore**: report_history の本番実装
//! - **InMemoryHistoryStore**: テスト用（障害注入つき）
//! - **LocalArtifactStore**: reports ディレクトリ上のファイル
//! - **PrometheusClient**: メトリクスバックエンド

pub mod inmem_store;
pub mod local_artifacts;
pub mod prometheus;
pub mod sqlite_store;

// 主要な型を再エクスポート
pub use self::inmem_store::InMemoryHistoryStore;
pub use self::local_artifacts::LocalArtifactStore;
pub use self::prometheus::{PrometheusClient, parse_query_response};
pub use self::sqlite_store::SqliteHistoryStore;

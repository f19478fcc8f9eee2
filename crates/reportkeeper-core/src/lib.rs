//! reportkeeper-core
//!
//! レポート履歴、期限切れレポートを削除する保持期間スイープ、
//! それらを支えるアダプタ（SQLite, ローカルファイル, Prometheus）。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, report, retention, metrics, errors）
//! - **ports**: 抽象化レイヤー（HistoryStore, ArtifactStore, MetricsSource, Clock）
//! - **impls**: 実装（SqliteHistoryStore, InMemoryHistoryStore, LocalArtifactStore, PrometheusClient）
//! - **app**: アプリケーションロジック（builder, sweeper, retention_loop, history）
//! - **config**: TOML 設定

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;

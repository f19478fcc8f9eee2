//! HistoryStore port - レポート履歴の正本（SQLite が実装）
//!
//! HistoryStore は以下を管理します：
//! - report_history の追加・参照
//! - soft delete（delete_time の更新）
//!
//! # 実装
//! - **SqliteHistoryStore**: 本番用
//! - **InMemoryHistoryStore**: テスト用

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{ExpiredReport, NewReport, Page, ReportId, ReportRecord, StoreError};

/// HistoryStore はレポート履歴の読み書きを提供
///
/// # 設計原則
/// - delete_time が入っている行はすべての読み取りから除外する
/// - 行の物理削除はしない。作成後に変わるのは delete_time だけ
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// 新しいレコードを保存して採番された id を返す
    async fn save(&self, report: NewReport) -> Result<ReportId, StoreError>;

    /// 削除されていないレコードを新しい順に返す
    async fn list(&self, page: Page) -> Result<Vec<ReportRecord>, StoreError>;

    /// 削除されていないレコードを 1 件返す（無ければ `StoreError::NotFound`）
    async fn get(&self, id: ReportId) -> Result<ReportRecord, StoreError>;

    /// `created_at <= cutoff` かつ未削除のレコードを新しい順に返す
    async fn list_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<ExpiredReport>, StoreError>;

    /// delete_time を設定する（既に削除済みの行には触らない）
    async fn mark_deleted(&self, id: ReportId, at: DateTime<Utc>) -> Result<(), StoreError>;
}

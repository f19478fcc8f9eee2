//! InMemoryHistoryStore - テスト用の履歴ストア
//!
//! # 学習ポイント
//! - tokio::sync::Mutex で状態を共有
//! - 失敗注入（listing 失敗、特定 id の mark_deleted 失敗）でエラーポリシーを検証できる

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::{ExpiredReport, NewReport, Page, ReportId, ReportRecord, StoreError};
use crate::ports::HistoryStore;

/// ストアの中身
#[derive(Default)]
struct InMemoryState {
    /// 削除済みを含む全行
    records: BTreeMap<ReportId, ReportRecord>,

    /// 次に採番する id
    next_id: i64,

    /// mark_deleted の呼び出し履歴（アサーション用）
    mark_deleted_calls: Vec<ReportId>,

    fail_listing: bool,
    fail_mark_deleted_on: Option<ReportId>,
}

/// InMemoryHistoryStore は HistoryStore の in-memory 実装
///
/// clone したハンドルは同じ状態を共有します。
#[derive(Clone, Default)]
pub struct InMemoryHistoryStore {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以降の list_older_than を失敗させる
    pub async fn fail_listing(&self) {
        self.state.lock().await.fail_listing = true;
    }

    /// 指定した id の mark_deleted を失敗させる
    pub async fn fail_mark_deleted_on(&self, id: ReportId) {
        self.state.lock().await.fail_mark_deleted_on = Some(id);
    }

    /// 削除済みを含む全行（id 順）
    pub async fn all_records(&self) -> Vec<ReportRecord> {
        self.state.lock().await.records.values().cloned().collect()
    }

    /// 削除済みを含む 1 行
    pub async fn raw(&self, id: ReportId) -> Option<ReportRecord> {
        self.state.lock().await.records.get(&id).cloned()
    }

    pub async fn mark_deleted_calls(&self) -> Vec<ReportId> {
        self.state.lock().await.mark_deleted_calls.clone()
    }

    /// 既に削除済みの行を直接入れる（スイープ対象外になることの確認用）
    pub async fn insert_deleted(&self, report: NewReport, deleted_at: DateTime<Utc>) -> ReportId {
        let mut state = self.state.lock().await;
        let id = state.allocate_id();
        let mut record = ReportRecord::from_new(id, report);
        record.deleted_at = Some(deleted_at);
        state.records.insert(id, record);
        id
    }
}

impl InMemoryState {
    fn allocate_id(&mut self) -> ReportId {
        self.next_id += 1;
        ReportId::new(self.next_id)
    }

    /// 未削除の行を created_at 降順（同時刻は id 降順）で返す
    fn live_newest_first(&self) -> Vec<&ReportRecord> {
        let mut live: Vec<_> = self.records.values().filter(|r| !r.is_deleted()).collect();
        live.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        live
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn save(&self, report: NewReport) -> Result<ReportId, StoreError> {
        let mut state = self.state.lock().await;
        let id = state.allocate_id();
        state.records.insert(id, ReportRecord::from_new(id, report));
        Ok(id)
    }

    async fn list(&self, page: Page) -> Result<Vec<ReportRecord>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .live_newest_first()
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .cloned()
            .collect())
    }

    async fn get(&self, id: ReportId) -> Result<ReportRecord, StoreError> {
        let state = self.state.lock().await;
        state
            .records
            .get(&id)
            .filter(|r| !r.is_deleted())
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn list_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<ExpiredReport>, StoreError> {
        let state = self.state.lock().await;
        if state.fail_listing {
            return Err(StoreError::Other("injected listing failure".to_string()));
        }
        Ok(state
            .live_newest_first()
            .into_iter()
            .filter(|r| r.created_at <= cutoff)
            .map(ReportRecord::to_expired)
            .collect())
    }

    async fn mark_deleted(&self, id: ReportId, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.mark_deleted_calls.push(id);
        if state.fail_mark_deleted_on == Some(id) {
            return Err(StoreError::Other(format!("injected mark_deleted failure for {id}")));
        }
        if let Some(record) = state.records.get_mut(&id)
            && record.deleted_at.is_none()
        {
            record.deleted_at = Some(at);
        }
        Ok(())
    }
}

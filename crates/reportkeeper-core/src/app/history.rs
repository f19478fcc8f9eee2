//! ReportHistory - レポート履歴の参照・登録・削除
//!
//! 明示的な削除もスイープと同じ順序で行う（soft delete -> ファイル削除）。

use std::sync::Arc;

use tracing::info;

use crate::domain::{HistoryError, NewReport, Page, ReportId, ReportRecord};
use crate::ports::{ArtifactStore, Clock, HistoryStore};

use super::sweeper::remove_artifact;

pub struct ReportHistory {
    store: Arc<dyn HistoryStore>,
    artifacts: Arc<dyn ArtifactStore>,
    clock: Arc<dyn Clock>,
}

impl ReportHistory {
    pub fn new(
        store: Arc<dyn HistoryStore>,
        artifacts: Arc<dyn ArtifactStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            artifacts,
            clock,
        }
    }

    /// 生成済みレポートを検証して保存する
    pub async fn record(&self, report: NewReport) -> Result<ReportId, HistoryError> {
        validate(&report)?;
        let id = self.store.save(report).await?;
        info!(%id, "report recorded");
        Ok(id)
    }

    pub async fn list(&self, page: Page) -> Result<Vec<ReportRecord>, HistoryError> {
        Ok(self.store.list(page).await?)
    }

    pub async fn get(&self, id: ReportId) -> Result<ReportRecord, HistoryError> {
        Ok(self.store.get(id).await?)
    }

    /// 明示的な削除要求
    ///
    /// 存在しない・削除済みのレコードは `NotFound`。
    /// ファイルは soft delete のあとに削除を試みる（失敗しても成功扱い）。
    pub async fn delete(&self, id: ReportId) -> Result<(), HistoryError> {
        let record = self.store.get(id).await?;
        self.store.mark_deleted(id, self.clock.now()).await?;
        let removed = remove_artifact(self.artifacts.as_ref(), id, &record.report_path).await;
        info!(%id, file_removed = removed, "report deleted");
        Ok(())
    }
}

fn validate(report: &NewReport) -> Result<(), HistoryError> {
    let required = [
        ("project", &report.project),
        ("datasource", &report.datasource),
        ("report_path", &report.report_path),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(HistoryError::Invalid(format!("{field} must not be empty")));
        }
    }
    Ok(())
}

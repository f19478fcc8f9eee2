//! RetentionSweeper - 期限切れレポートの削除
//!
//! # フロー
//! 1. cutoff = now - max_age_days を計算
//! 2. created_at <= cutoff の未削除レコードを検索
//! 3. レコードごとに delete_time を更新し、レポートファイルを削除
//!
//! # エラーポリシー
//! - 検索に失敗したら何もせずに中断
//! - delete_time の更新に失敗したらそこで中断（残りは未処理、ロールバックなし）
//! - ファイル削除の失敗はログに残すだけで、soft delete は妨げない

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::domain::{ArtifactError, RetentionPolicy, ReportId, SweepError, SweepReport};
use crate::ports::{ArtifactStore, Clock, HistoryStore};

/// RetentionSweeper は 1 回分のスイープを実行する
pub struct RetentionSweeper {
    store: Arc<dyn HistoryStore>,
    artifacts: Arc<dyn ArtifactStore>,
    clock: Arc<dyn Clock>,
    policy: RetentionPolicy,
}

impl RetentionSweeper {
    pub fn new(
        store: Arc<dyn HistoryStore>,
        artifacts: Arc<dyn ArtifactStore>,
        clock: Arc<dyn Clock>,
        policy: RetentionPolicy,
    ) -> Self {
        Self {
            store,
            artifacts,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    /// 期限切れのレコードを soft delete し、ファイルを削除する
    ///
    /// 処理は 1 件ずつ順番に行う（並列化しない）。
    pub async fn sweep_once(&self) -> Result<SweepReport, SweepError> {
        let now = self.clock.now();
        let cutoff = self.policy.cutoff(now);

        let expired = self
            .store
            .list_older_than(cutoff)
            .await
            .map_err(SweepError::List)?;

        let mut report = SweepReport::empty(cutoff);
        report.matched = expired.len();
        if expired.is_empty() {
            debug!(cutoff = %cutoff, "no expired reports");
            return Ok(report);
        }

        for (processed, record) in expired.iter().enumerate() {
            if let Err(source) = self.store.mark_deleted(record.id, now).await {
                error!(id = %record.id, processed, error = %source, "aborting sweep");
                return Err(SweepError::MarkDeleted {
                    id: record.id,
                    processed,
                    source,
                });
            }
            report.deleted += 1;

            if remove_artifact(self.artifacts.as_ref(), record.id, &record.report_path).await {
                report.files_removed += 1;
            } else {
                report.files_failed += 1;
            }
        }

        info!(
            cutoff = %cutoff,
            max_age_days = self.policy.max_age_days(),
            deleted = report.deleted,
            files_removed = report.files_removed,
            files_failed = report.files_failed,
            "retention sweep finished"
        );
        Ok(report)
    }
}

/// レポートファイルを削除し、成功したかどうかを返す（エラーは握りつぶす）
pub(crate) async fn remove_artifact(
    artifacts: &dyn ArtifactStore,
    id: ReportId,
    relative_path: &str,
) -> bool {
    match artifacts.remove(relative_path).await {
        Ok(()) => true,
        Err(ArtifactError::NotFound(path)) => {
            debug!(%id, path = %path.display(), "report artifact already absent");
            false
        }
        Err(err) => {
            warn!(%id, error = %err, "failed to remove report artifact");
            false
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::{NewReport, Page};
    use crate::impls::{InMemoryHistoryStore, LocalArtifactStore, SqliteHistoryStore};
    use crate::ports::FixedClock;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::HashSet;
    use tokio::sync::Mutex;

    /// 削除要求を記録するだけの ArtifactStore
    #[derive(Default)]
    pub(crate) struct RecordingArtifacts {
        removed: Mutex<Vec<String>>,
        missing: HashSet<String>,
    }

    impl RecordingArtifacts {
        pub(crate) fn with_missing(paths: &[&str]) -> Self {
            Self {
                removed: Mutex::new(Vec::new()),
                missing: paths.iter().map(|p| p.to_string()).collect(),
            }
        }

        pub(crate) async fn removed(&self) -> Vec<String> {
            self.removed.lock().await.clone()
        }
    }

    #[async_trait]
    impl ArtifactStore for RecordingArtifacts {
        async fn remove(&self, relative_path: &str) -> Result<(), ArtifactError> {
            self.removed.lock().await.push(relative_path.to_string());
            if self.missing.contains(relative_path) {
                return Err(ArtifactError::NotFound(relative_path.into()));
            }
            Ok(())
        }
    }

    fn at(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    fn report(created_at: DateTime<Utc>, path: &str) -> NewReport {
        NewReport::new(created_at, "shop", "prod-prometheus", path)
    }

    fn sweeper(
        store: &InMemoryHistoryStore,
        artifacts: &Arc<RecordingArtifacts>,
        now: DateTime<Utc>,
        max_age_days: u32,
    ) -> RetentionSweeper {
        RetentionSweeper::new(
            Arc::new(store.clone()),
            artifacts.clone(),
            Arc::new(FixedClock::new(now)),
            RetentionPolicy::new(max_age_days),
        )
    }

    #[tokio::test]
    async fn sweeps_only_records_at_or_before_cutoff() {
        // maxAge=7, now=2024-01-10 -> cutoff=2024-01-03
        let store = InMemoryHistoryStore::new();
        let a = store.save(report(at(1), "a.html")).await.unwrap();
        let b = store.save(report(at(5), "b.html")).await.unwrap();
        let artifacts = Arc::new(RecordingArtifacts::default());

        let result = sweeper(&store, &artifacts, at(10), 7).sweep_once().await.unwrap();

        assert_eq!(result.cutoff, at(3));
        assert_eq!(result.matched, 1);
        assert_eq!(result.deleted, 1);
        assert_eq!(result.files_removed, 1);
        assert_eq!(store.raw(a).await.unwrap().deleted_at, Some(at(10)));
        assert_eq!(store.raw(b).await.unwrap().deleted_at, None);
        assert_eq!(artifacts.removed().await, vec!["a.html"]);
    }

    #[tokio::test]
    async fn swept_records_disappear_from_listings() {
        let store = InMemoryHistoryStore::new();
        store.save(report(at(1), "a.html")).await.unwrap();
        store.save(report(at(2), "b.html")).await.unwrap();
        let artifacts = Arc::new(RecordingArtifacts::default());

        sweeper(&store, &artifacts, at(10), 7).sweep_once().await.unwrap();

        assert!(store.list(Page::default()).await.unwrap().is_empty());
        assert!(store.list_older_than(at(10)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn record_created_exactly_at_cutoff_is_swept() {
        let store = InMemoryHistoryStore::new();
        let edge = store.save(report(at(3), "edge.html")).await.unwrap();
        let artifacts = Arc::new(RecordingArtifacts::default());

        sweeper(&store, &artifacts, at(10), 7).sweep_once().await.unwrap();

        assert!(store.raw(edge).await.unwrap().is_deleted());
    }

    #[tokio::test]
    async fn already_deleted_records_are_not_touched_again() {
        let store = InMemoryHistoryStore::new();
        let old = store.insert_deleted(report(at(1), "old.html"), at(2)).await;
        let artifacts = Arc::new(RecordingArtifacts::default());

        let result = sweeper(&store, &artifacts, at(10), 7).sweep_once().await.unwrap();

        assert_eq!(result.matched, 0);
        assert!(store.mark_deleted_calls().await.is_empty());
        assert!(artifacts.removed().await.is_empty());
        assert_eq!(store.raw(old).await.unwrap().deleted_at, Some(at(2)));
    }

    #[tokio::test]
    async fn empty_sweep_performs_no_mutations() {
        let store = InMemoryHistoryStore::new();
        store.save(report(at(9), "fresh.html")).await.unwrap();
        let artifacts = Arc::new(RecordingArtifacts::default());

        let result = sweeper(&store, &artifacts, at(10), 7).sweep_once().await.unwrap();

        assert_eq!(result, SweepReport::empty(at(3)));
        assert!(store.mark_deleted_calls().await.is_empty());
        assert!(artifacts.removed().await.is_empty());
    }

    #[tokio::test]
    async fn huge_max_age_keeps_everything_without_panicking() {
        let store = InMemoryHistoryStore::new();
        let a = store.save(report(at(1), "a.html")).await.unwrap();
        let artifacts = Arc::new(RecordingArtifacts::default());

        let result = sweeper(&store, &artifacts, at(10), 100_000_000)
            .sweep_once()
            .await
            .unwrap();

        assert_eq!(result.cutoff, DateTime::<Utc>::MIN_UTC);
        assert_eq!(result.matched, 0);
        assert!(!store.raw(a).await.unwrap().is_deleted());
        assert!(artifacts.removed().await.is_empty());
    }

    #[tokio::test]
    async fn listing_failure_aborts_before_any_processing() {
        let store = InMemoryHistoryStore::new();
        store.save(report(at(1), "a.html")).await.unwrap();
        store.fail_listing().await;
        let artifacts = Arc::new(RecordingArtifacts::default());

        let err = sweeper(&store, &artifacts, at(10), 7)
            .sweep_once()
            .await
            .unwrap_err();

        assert!(matches!(err, SweepError::List(_)));
        assert!(store.mark_deleted_calls().await.is_empty());
        assert!(artifacts.removed().await.is_empty());
    }

    #[tokio::test]
    async fn mark_deleted_failure_leaves_later_records_unprocessed() {
        let store = InMemoryHistoryStore::new();
        // 処理順は created_at 降順: c(3日) -> b(2日) -> a(1日)
        let a = store.save(report(at(1), "a.html")).await.unwrap();
        let b = store.save(report(at(2), "b.html")).await.unwrap();
        let c = store.save(report(at(3), "c.html")).await.unwrap();
        store.fail_mark_deleted_on(b).await;
        let artifacts = Arc::new(RecordingArtifacts::default());

        let err = sweeper(&store, &artifacts, at(10), 7)
            .sweep_once()
            .await
            .unwrap_err();

        match err {
            SweepError::MarkDeleted { id, processed, .. } => {
                assert_eq!(id, b);
                assert_eq!(processed, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(store.raw(c).await.unwrap().is_deleted());
        assert!(!store.raw(b).await.unwrap().is_deleted());
        assert!(!store.raw(a).await.unwrap().is_deleted());
        assert_eq!(store.mark_deleted_calls().await, vec![c, b]);
        // b のファイルは soft delete 失敗のため削除しない
        assert_eq!(artifacts.removed().await, vec!["c.html"]);
    }

    #[tokio::test]
    async fn missing_file_does_not_block_soft_delete() {
        let store = InMemoryHistoryStore::new();
        let a = store.save(report(at(1), "gone.html")).await.unwrap();
        let b = store.save(report(at(2), "there.html")).await.unwrap();
        let artifacts = Arc::new(RecordingArtifacts::with_missing(&["gone.html"]));

        let result = sweeper(&store, &artifacts, at(10), 7).sweep_once().await.unwrap();

        assert_eq!(result.deleted, 2);
        assert_eq!(result.files_removed, 1);
        assert_eq!(result.files_failed, 1);
        assert!(store.raw(a).await.unwrap().is_deleted());
        assert!(store.raw(b).await.unwrap().is_deleted());
    }

    #[tokio::test]
    async fn second_sweep_is_a_no_op() {
        let store = InMemoryHistoryStore::new();
        store.save(report(at(1), "a.html")).await.unwrap();
        let artifacts = Arc::new(RecordingArtifacts::default());
        let sweeper = sweeper(&store, &artifacts, at(10), 7);

        sweeper.sweep_once().await.unwrap();
        let second = sweeper.sweep_once().await.unwrap();

        assert_eq!(second.matched, 0);
        assert_eq!(artifacts.removed().await.len(), 1);
    }

    #[tokio::test]
    async fn sweeps_sqlite_rows_and_files_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let reports_dir = dir.path().join("reports");
        std::fs::create_dir_all(reports_dir.join("shop")).unwrap();
        std::fs::write(reports_dir.join("shop/old.html"), "old").unwrap();
        std::fs::write(reports_dir.join("shop/new.html"), "new").unwrap();

        let store = SqliteHistoryStore::open(dir.path().join("sqlite.db")).unwrap();
        let old = store.save(report(at(1), "shop/old.html")).await.unwrap();
        let new = store.save(report(at(5), "shop/new.html")).await.unwrap();
        // ファイルが既に無いレコード
        let orphan = store.save(report(at(2), "shop/orphan.html")).await.unwrap();

        let sweeper = RetentionSweeper::new(
            Arc::new(store.clone()),
            Arc::new(LocalArtifactStore::new(&reports_dir)),
            Arc::new(FixedClock::new(at(10))),
            RetentionPolicy::new(7),
        );
        let result = sweeper.sweep_once().await.unwrap();

        assert_eq!(result.deleted, 2);
        assert_eq!(result.files_removed, 1);
        assert_eq!(result.files_failed, 1);
        assert!(!reports_dir.join("shop/old.html").exists());
        assert!(reports_dir.join("shop/new.html").exists());
        assert!(store.get(old).await.is_err());
        assert!(store.get(orphan).await.is_err());
        assert_eq!(store.get(new).await.unwrap().report_path, "shop/new.html");
    }
}

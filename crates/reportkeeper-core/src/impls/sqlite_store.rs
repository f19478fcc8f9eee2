//! SqliteHistoryStore - report_history テーブルの本番実装
//!
//! # 実装詳細
//! - r2d2 のコネクションプール（最大 5 本）
//! - 各コネクションで WAL などの PRAGMA を設定
//! - rusqlite は blocking なので spawn_blocking の中で実行
//! - 時刻は UTC の unix ナノ秒（INTEGER）で保存（1677 年〜2262 年）
//!   精度を落とさないので cutoff との `<=` 比較がインメモリ実装と一致する

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::domain::{
    AlertCounts, ExpiredReport, NewReport, Page, ReportId, ReportRecord, ReportSummary, StoreError,
};
use crate::ports::HistoryStore;

const MAX_POOL_SIZE: u32 = 5;
const BUSY_TIMEOUT: Duration = Duration::from_millis(2000);

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS report_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_name TEXT NOT NULL,
    datasource TEXT NOT NULL,
    report_path TEXT NOT NULL,
    task_id TEXT,
    task_time INTEGER,
    file_size INTEGER,
    created_at INTEGER NOT NULL,
    max_value REAL,
    min_value REAL,
    average REAL,
    total_count INTEGER NOT NULL,
    alert_count INTEGER NOT NULL,
    critical_count INTEGER NOT NULL,
    warning_count INTEGER NOT NULL,
    delete_time INTEGER
);
CREATE INDEX IF NOT EXISTS idx_report_history_project_name ON report_history(project_name);
CREATE INDEX IF NOT EXISTS idx_report_history_datasource ON report_history(datasource);
CREATE INDEX IF NOT EXISTS idx_report_history_created_at ON report_history(created_at);
"#;

const RECORD_COLUMNS: &str = "id, project_name, datasource, report_path, task_id, task_time, \
     file_size, created_at, max_value, min_value, average, total_count, alert_count, \
     critical_count, warning_count";

/// SqliteHistoryStore は SQLite ファイルに履歴を保存する
///
/// # 使用例
/// ```ignore
/// let store = SqliteHistoryStore::open("data/sqlite.db")?;
/// let id = store.save(report).await?;
/// ```
#[derive(Clone)]
pub struct SqliteHistoryStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteHistoryStore {
    /// DB ファイルを開き、無ければテーブルを作る
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let manager = SqliteConnectionManager::file(&path).with_init(|conn| {
            conn.busy_timeout(BUSY_TIMEOUT)?;
            configure_connection(conn)
        });
        let pool = Pool::builder().max_size(MAX_POOL_SIZE).build(manager)?;

        let conn = pool.get()?;
        conn.execute_batch(SCHEMA)?;
        tracing::debug!(path = %path.display(), "report history database ready");

        Ok(Self { pool })
    }

    /// プールから 1 本取り出して blocking スレッドで実行
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            f(&conn)
        })
        .await?
    }
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA cache_size = 1000;
PRAGMA temp_store = memory;
"#,
    )
}

fn to_nanos(at: DateTime<Utc>) -> rusqlite::Result<i64> {
    at.timestamp_nanos_opt().ok_or_else(|| {
        rusqlite::Error::ToSqlConversionFailure(format!("timestamp out of range: {at}").into())
    })
}

fn from_nanos(nanos: i64) -> DateTime<Utc> {
    Utc.timestamp_nanos(nanos)
}

/// cutoff を保存形式に変換する
///
/// 範囲より前なら該当なし（None）、範囲より後ならすべてが該当。
fn cutoff_nanos(cutoff: DateTime<Utc>) -> Option<i64> {
    match cutoff.timestamp_nanos_opt() {
        Some(nanos) => Some(nanos),
        None if cutoff.timestamp() > 0 => Some(i64::MAX),
        None => None,
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<ReportRecord> {
    Ok(ReportRecord {
        id: ReportId::new(row.get(0)?),
        project: row.get(1)?,
        datasource: row.get(2)?,
        report_path: row.get(3)?,
        task_id: row.get(4)?,
        task_time: row.get(5)?,
        file_size: row.get(6)?,
        created_at: from_nanos(row.get(7)?),
        summary: ReportSummary {
            max_value: row.get::<_, Option<f64>>(8)?.unwrap_or_default(),
            min_value: row.get::<_, Option<f64>>(9)?.unwrap_or_default(),
            average: row.get::<_, Option<f64>>(10)?.unwrap_or_default(),
        },
        counts: AlertCounts {
            total_count: row.get(11)?,
            alert_count: row.get(12)?,
            critical_count: row.get(13)?,
            warning_count: row.get(14)?,
        },
        // 読み取りクエリは delete_time IS NULL で絞っている
        deleted_at: None,
    })
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn save(&self, report: NewReport) -> Result<ReportId, StoreError> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO report_history \
                 (project_name, datasource, report_path, task_id, task_time, file_size, created_at, \
                  max_value, min_value, average, total_count, alert_count, critical_count, warning_count) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    report.project,
                    report.datasource,
                    report.report_path,
                    report.task_id,
                    report.task_time,
                    report.file_size,
                    to_nanos(report.created_at)?,
                    report.summary.max_value,
                    report.summary.min_value,
                    report.summary.average,
                    report.counts.total_count,
                    report.counts.alert_count,
                    report.counts.critical_count,
                    report.counts.warning_count,
                ],
            )?;
            Ok(ReportId::new(conn.last_insert_rowid()))
        })
        .await
    }

    async fn list(&self, page: Page) -> Result<Vec<ReportRecord>, StoreError> {
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {RECORD_COLUMNS} FROM report_history WHERE delete_time IS NULL \
                 ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![page.limit, page.offset], record_from_row)?;
            let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(records)
        })
        .await
    }

    async fn get(&self, id: ReportId) -> Result<ReportRecord, StoreError> {
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {RECORD_COLUMNS} FROM report_history WHERE delete_time IS NULL AND id = ?1"
            );
            conn.query_row(&sql, params![id.get()], record_from_row)
                .optional()?
                .ok_or(StoreError::NotFound(id))
        })
        .await
    }

    async fn list_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<ExpiredReport>, StoreError> {
        let Some(cutoff) = cutoff_nanos(cutoff) else {
            return Ok(Vec::new());
        };
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, report_path, created_at FROM report_history \
                 WHERE delete_time IS NULL AND created_at <= ?1 \
                 ORDER BY created_at DESC, id DESC",
            )?;
            let rows = stmt.query_map(params![cutoff], |row| {
                Ok(ExpiredReport {
                    id: ReportId::new(row.get(0)?),
                    report_path: row.get(1)?,
                    created_at: from_nanos(row.get(2)?),
                })
            })?;
            let expired = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(expired)
        })
        .await
    }

    async fn mark_deleted(&self, id: ReportId, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE report_history SET delete_time = ?1 WHERE id = ?2 AND delete_time IS NULL",
                params![to_nanos(at)?, id.get()],
            )?;
            if changed == 0 {
                tracing::debug!(%id, "report already deleted or missing");
            }
            Ok(())
        })
        .await
    }
}

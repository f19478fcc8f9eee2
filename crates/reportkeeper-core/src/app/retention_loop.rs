//! RetentionLoop - スイープの定期実行
//!
//! # フロー
//! 1. 起動直後に 1 回スイープ
//! 2. 以降は interval ごとにスイープ
//! 3. shutdown が来たら次の tick を待たずに抜ける
//!
//! 1 回のスイープが失敗してもループは止めない（次の tick でやり直す）。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::sweeper::RetentionSweeper;

/// RetentionLoop は RetentionSweeper を定期的に実行する
pub struct RetentionLoop {
    sweeper: Arc<RetentionSweeper>,
    interval: Duration,
}

impl RetentionLoop {
    pub fn new(sweeper: Arc<RetentionSweeper>, interval: Duration) -> Self {
        Self { sweeper, interval }
    }

    /// shutdown が true になるか sender が drop されるまで回る
    ///
    /// 戻り値は実行したスイープの回数。
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) -> usize {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut sweeps = 0;

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            tokio::select! {
                biased;
                changed = shutdown_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    // 変更が入ったら次のループで判定
                    continue;
                }
                _ = ticker.tick() => {}
            }

            sweeps += 1;
            match self.sweeper.sweep_once().await {
                Ok(report) => {
                    tracing::debug!(sweeps, deleted = report.deleted, "retention tick done");
                }
                Err(err) => {
                    tracing::error!(sweeps, processed = err.processed(), error = %err, "retention sweep failed");
                }
            }
        }

        tracing::info!(sweeps, "retention loop stopped");
        sweeps
    }

    /// バックグラウンドで起動
    pub fn spawn(self) -> RetentionHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(self.run(shutdown_rx));
        RetentionHandle { shutdown_tx, join }
    }
}

/// RetentionHandle はバックグラウンドのループを止めるためのハンドル
pub struct RetentionHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<usize>,
}

impl RetentionHandle {
    /// 実行中のスイープは最後まで走らせ、次の tick から止める
    pub fn request_shutdown(&self) {
        // ignore send error: the loop may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    /// 停止を要求して終了を待つ。戻り値は実行したスイープの回数
    pub async fn shutdown_and_join(self) -> Result<usize, tokio::task::JoinError> {
        self.request_shutdown();
        self.join.await
    }
}

//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: 設定からのワイヤリング
//! - **RetentionSweeper**: 期限切れレポートの削除（1 回分）
//! - **RetentionLoop**: スイープの定期実行
//! - **ReportHistory**: 履歴の参照・登録・明示的な削除

pub mod builder;
pub mod history;
pub mod retention_loop;
pub mod sweeper;

// 主要な型を再エクスポート
pub use self::builder::{App, AppBuilder, BuildError};
pub use self::history::ReportHistory;
pub use self::retention_loop::{RetentionHandle, RetentionLoop};
pub use self::sweeper::RetentionSweeper;

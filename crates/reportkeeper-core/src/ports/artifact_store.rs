//! ArtifactStore port - 生成済みレポートファイルの置き場
//!
//! # 実装
//! - **LocalArtifactStore**: reports ディレクトリ配下のファイル

use async_trait::async_trait;

use crate::domain::ArtifactError;

/// ArtifactStore はレポートファイルを削除する
///
/// # 設計原則
/// - path は reports ディレクトリからの相対パス（DB に保存された値そのもの）
/// - 呼び出し側（スイープ）は失敗をログに残すだけで処理を続ける
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn remove(&self, relative_path: &str) -> Result<(), ArtifactError>;
}

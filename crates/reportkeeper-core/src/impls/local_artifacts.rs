//! LocalArtifactStore - reports ディレクトリ上のレポートファイル
//!
//! DB に入っている相対パスを reports ディレクトリに join して削除します。
//! 絶対パスや `..` を含むパスは reports ディレクトリの外を指しうるので拒否します。

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::domain::ArtifactError;
use crate::ports::ArtifactStore;

/// LocalArtifactStore はローカルファイルシステムの ArtifactStore
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 相対パスを root 配下の絶対パスに解決
    pub fn resolve(&self, relative_path: &str) -> Result<PathBuf, ArtifactError> {
        let relative = Path::new(relative_path);
        let mut has_normal = false;
        for component in relative.components() {
            match component {
                Component::Normal(_) => has_normal = true,
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(ArtifactError::OutsideRoot(relative_path.to_string()));
                }
            }
        }
        if !has_normal {
            return Err(ArtifactError::OutsideRoot(relative_path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn remove(&self, relative_path: &str) -> Result<(), ArtifactError> {
        let path = self.resolve(relative_path)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ArtifactError::NotFound(path)),
            Err(source) => Err(ArtifactError::Io { path, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[tokio::test]
    async fn removes_file_under_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("shop")).unwrap();
        let file = dir.path().join("shop").join("2024-01-01.html");
        std::fs::write(&file, "<html></html>").unwrap();

        let store = LocalArtifactStore::new(dir.path());
        store.remove("shop/2024-01-01.html").await.unwrap();
        assert!(!file.exists());
    }

    #[tokio::test]
    async fn missing_file_is_reported_as_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path());

        let err = store.remove("gone.html").await.unwrap_err();
        assert!(matches!(err, ArtifactError::NotFound(path) if path.ends_with("gone.html")));
    }

    #[rstest]
    #[case::parent("../secrets.txt")]
    #[case::nested_parent("shop/../../secrets.txt")]
    #[case::absolute("/etc/passwd")]
    #[case::empty("")]
    #[case::only_dot(".")]
    fn rejects_paths_outside_root(#[case] relative: &str) {
        let store = LocalArtifactStore::new("/srv/reports");
        assert!(matches!(
            store.resolve(relative),
            Err(ArtifactError::OutsideRoot(_))
        ));
    }

    #[test]
    fn resolves_dot_prefixed_paths() {
        let store = LocalArtifactStore::new("/srv/reports");
        assert_eq!(
            store.resolve("./shop/a.html").unwrap(),
            PathBuf::from("/srv/reports/./shop/a.html")
        );
    }
}

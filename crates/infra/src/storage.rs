//! # 写真ファイルの保存
//!
//! アップロードされたブートキャンプ写真を保存する。
//! ローカル実装は `FILE_UPLOAD_PATH` 配下にファイル名そのままで書き込み、
//! `/uploads/*` として静的配信される。

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::InfraError;

/// 写真保存トレイト
#[async_trait]
pub trait PhotoStorage: Send + Sync {
    /// ファイルを保存する（同名ファイルは上書き）
    async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<(), InfraError>;
}

/// ローカルファイルシステムへの保存
#[derive(Debug, Clone)]
pub struct LocalPhotoStorage {
    root: PathBuf,
}

impl LocalPhotoStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, file_name: &str) -> Result<PathBuf, InfraError> {
        let name = Path::new(file_name);
        if name.file_name().map(Path::new) != Some(name) {
            return Err(InfraError::unexpected(format!(
                "不正なファイル名: {file_name}"
            )));
        }
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl PhotoStorage for LocalPhotoStorage {
    #[tracing::instrument(skip_all, level = "debug", fields(file_name = %file_name, size = bytes.len()))]
    async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<(), InfraError> {
        let path = self.path_for(file_name)?;
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("devcamper-storage-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_ファイルを保存できる() {
        let root = temp_root();
        let storage = LocalPhotoStorage::new(&root);

        storage.save("photo_1.jpg", b"jpeg-bytes").await.unwrap();

        let saved = tokio::fs::read(root.join("photo_1.jpg")).await.unwrap();
        assert_eq!(saved, b"jpeg-bytes");
        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn test_ディレクトリを含むファイル名は拒否する() {
        let root = temp_root();
        let storage = LocalPhotoStorage::new(&root);

        let result = storage.save("../escape.jpg", b"x").await;

        assert!(result.is_err());
        assert!(!root.exists());
    }
}

use std::{
    io::Result,
    path::{Path, PathBuf},
};

use bytes::Bytes;

use crate::async_trait;

use super::DurablePersistence;

/// One file per key, named by the hex sha256 of the key.
#[derive(Debug)]
pub struct FilesystemPersistence {
    root: PathBuf,
}

impl FilesystemPersistence {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, key: &str) -> PathBuf {
        use sha2::{Digest, Sha256};
        // workaround for https://github.com/rust-lang/rust-analyzer/issues/15242
        let mut hasher = <Sha256 as Digest>::new();
        hasher.update(key.as_bytes());
        self.root.join(hex::encode(hasher.finalize()))
    }
}

#[async_trait]
impl DurablePersistence for FilesystemPersistence {
    async fn load(&self, key: &str) -> Result<Option<Bytes>> {
        match tokio::fs::read(self.path(key)).await {
            Ok(content) => Ok(Some(Bytes::from(content))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }
    async fn save(&self, key: &str, bytes: Bytes) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.path(key);
        let temp = path.with_extension(format!("tmp-{}", ulid::Ulid::new()));
        tokio::fs::write(&temp, &bytes).await?;
        if let Err(err) = tokio::fs::rename(&temp, &path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(err);
        }
        Ok(())
    }
    async fn delete(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}

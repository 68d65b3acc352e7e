use std::{io::ErrorKind, path::PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

#[async_trait]
pub trait MetadataRepository: Send + Sync {
    async fn load(&self) -> Result<Option<String>>;
    async fn save(&self, record: &str) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

#[derive(Clone, Debug)]
pub struct FileMetadataRepository {
    path: PathBuf,
}

impl FileMetadataRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MetadataRepository for FileMetadataRepository {
    async fn load(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err)
                .with_context(|| format!("reading metadata cache {}", self.path.display())),
        }
    }

    async fn save(&self, record: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, record)
            .await
            .with_context(|| format!("writing metadata cache {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replacing metadata cache {}", self.path.display()))?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err)
                .with_context(|| format!("removing metadata cache {}", self.path.display())),
        }
    }
}

#[derive(Default)]
pub struct InMemoryMetadataRepository {
    record: RwLock<Option<String>>,
}

impl InMemoryMetadataRepository {
    pub fn with_record(record: impl Into<String>) -> Self {
        Self {
            record: RwLock::new(Some(record.into())),
        }
    }

    pub async fn current(&self) -> Option<String> {
        self.record.read().await.clone()
    }
}

#[async_trait]
impl MetadataRepository for InMemoryMetadataRepository {
    async fn load(&self) -> Result<Option<String>> {
        Ok(self.record.read().await.clone())
    }

    async fn save(&self, record: &str) -> Result<()> {
        *self.record.write().await = Some(record.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.record.write().await = None;
        Ok(())
    }
}

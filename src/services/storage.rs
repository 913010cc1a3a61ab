use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncWriteExt};

/// An upload persisted to intake storage
#[derive(Debug, Clone)]
pub struct StoredUpload {
    /// Name as sent by the client
    pub original_filename: String,
    /// Sanitized name used on disk
    pub filename: String,
    pub path: PathBuf,
    pub size: u64,
}

#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the intake and processed directories if missing.
    async fn ensure_dirs(&self) -> Result<()>;

    /// Streams `reader` into intake storage under `filename`, replacing any
    /// previous file of that name.
    async fn save_upload<'a>(
        &self,
        original_filename: &str,
        filename: &str,
        reader: Box<dyn AsyncRead + Unpin + Send + 'a>,
    ) -> Result<StoredUpload>;

    /// Destination for an OCR result, with the processed directory created.
    async fn processed_path(&self, filename: &str) -> Result<PathBuf>;

    /// Looks up a processed file by client-supplied name. Anything that does
    /// not resolve to a regular file directly inside the processed root is
    /// reported as absent.
    async fn resolve_processed(&self, filename: &str) -> Result<Option<PathBuf>>;
}

pub struct LocalStorageService {
    upload_dir: PathBuf,
    processed_dir: PathBuf,
}

impl LocalStorageService {
    pub fn new(upload_dir: impl Into<PathBuf>, processed_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            processed_dir: processed_dir.into(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn processed_dir(&self) -> &Path {
        &self.processed_dir
    }
}

fn is_plain_filename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

#[async_trait]
impl StorageService for LocalStorageService {
    async fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.upload_dir, &self.processed_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("cannot create directory {}", dir.display()))?;
        }
        Ok(())
    }

    async fn save_upload<'a>(
        &self,
        original_filename: &str,
        filename: &str,
        mut reader: Box<dyn AsyncRead + Unpin + Send + 'a>,
    ) -> Result<StoredUpload> {
        tokio::fs::create_dir_all(&self.upload_dir)
            .await
            .with_context(|| format!("cannot create directory {}", self.upload_dir.display()))?;

        let path = self.upload_dir.join(filename);
        let mut file = tokio::fs::File::create(&path)
            .await
            .with_context(|| format!("cannot create {}", path.display()))?;

        let size = tokio::io::copy(&mut reader, &mut file)
            .await
            .with_context(|| format!("cannot write {}", path.display()))?;
        file.flush().await?;

        tracing::debug!("💾 Stored upload {} ({} bytes)", path.display(), size);

        Ok(StoredUpload {
            original_filename: original_filename.to_string(),
            filename: filename.to_string(),
            path,
            size,
        })
    }

    async fn processed_path(&self, filename: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.processed_dir)
            .await
            .with_context(|| {
                format!("cannot create directory {}", self.processed_dir.display())
            })?;
        Ok(self.processed_dir.join(filename))
    }

    async fn resolve_processed(&self, filename: &str) -> Result<Option<PathBuf>> {
        if !is_plain_filename(filename) {
            tracing::warn!("Rejected download name outside processed storage: {:?}", filename);
            return Ok(None);
        }

        let candidate = self.processed_dir.join(filename);
        let resolved = match tokio::fs::canonicalize(&candidate).await {
            Ok(p) => p,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("cannot resolve {}", candidate.display()));
            }
        };

        let root = tokio::fs::canonicalize(&self.processed_dir)
            .await
            .with_context(|| format!("cannot resolve {}", self.processed_dir.display()))?;

        if resolved.parent() != Some(root.as_path()) {
            tracing::warn!(
                "Rejected download {:?}: resolves to {}",
                filename,
                resolved.display()
            );
            return Ok(None);
        }

        let metadata = tokio::fs::metadata(&resolved).await?;
        if !metadata.is_file() {
            return Ok(None);
        }

        Ok(Some(resolved))
    }
}

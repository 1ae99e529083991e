use async_trait::async_trait;
use google_cloud_storage::client::Client as GcsClient;
use google_cloud_storage::http::objects::delete::DeleteObjectRequest;
use google_cloud_storage::http::objects::upload::{Media, UploadObjectRequest, UploadType};
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid blob path: {0}")]
    InvalidPath(String),
    #[error("upload of {path} failed: {message}")]
    Upload { path: String, message: String },
    #[error("delete of {path} failed: {message}")]
    Delete { path: String, message: String },
}

/// Upload-by-path storage for photos. Paths are relative, `/`-separated.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `data` at `path` and returns a URL the photo can be fetched from.
    async fn upload(&self, path: &str, data: Vec<u8>, content_type: &str) -> Result<String, StorageError>;

    async fn delete(&self, path: &str) -> Result<(), StorageError>;
}

/// Handle shared across request handlers.
pub type SharedBlobStore = std::sync::Arc<dyn BlobStore>;

/// Reduces a client-supplied file name to something safe to embed in a blob path.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

fn checked_relative(path: &str) -> Result<PathBuf, StorageError> {
    let candidate = Path::new(path);
    let safe = !path.is_empty()
        && candidate
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if safe {
        Ok(candidate.to_path_buf())
    } else {
        Err(StorageError::InvalidPath(path.to_string()))
    }
}

/// Writes blobs below a local directory, served by the HTTP layer under `/uploads`.
#[derive(Clone, Debug)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(&self, path: &str, data: Vec<u8>, _content_type: &str) -> Result<String, StorageError> {
        let relative = checked_relative(path)?;
        let target = self.root.join(&relative);
        let fail = |e: std::io::Error| StorageError::Upload {
            path: path.to_string(),
            message: e.to_string(),
        };
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(fail)?;
        }
        tokio::fs::write(&target, data).await.map_err(fail)?;
        Ok(format!("{}/uploads/{}", self.public_base_url, path))
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let relative = checked_relative(path)?;
        tokio::fs::remove_file(self.root.join(relative))
            .await
            .map_err(|e| StorageError::Delete {
                path: path.to_string(),
                message: e.to_string(),
            })
    }
}

#[derive(Clone)]
pub struct GcsBlobStore {
    client: GcsClient,
    bucket: String,
}

impl GcsBlobStore {
    pub fn new(client: GcsClient, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl BlobStore for GcsBlobStore {
    async fn upload(&self, path: &str, data: Vec<u8>, content_type: &str) -> Result<String, StorageError> {
        checked_relative(path)?;
        let upload_type = UploadType::Simple(Media {
            name: path.to_string().into(),
            content_type: content_type.to_string().into(),
            content_length: Some(data.len() as u64),
        });

        self.client
            .upload_object(
                &UploadObjectRequest {
                    bucket: self.bucket.clone(),
                    ..Default::default()
                },
                data,
                &upload_type,
            )
            .await
            .map_err(|e| StorageError::Upload {
                path: path.to_string(),
                message: e.to_string(),
            })?;

        Ok(format!("https://storage.googleapis.com/{}/{}", self.bucket, path))
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.client
            .delete_object(&DeleteObjectRequest {
                bucket: self.bucket.clone(),
                object: path.to_string(),
                ..Default::default()
            })
            .await
            .map_err(|e| StorageError::Delete {
                path: path.to_string(),
                message: e.to_string(),
            })
    }
}

/// Best-effort removal of blobs whose owning record never got written.
/// Returns the paths that could not be removed; those are logged as orphans.
pub async fn compensate(blobs: &dyn BlobStore, paths: &[String]) -> Vec<String> {
    let mut orphans = Vec::new();
    for path in paths {
        match blobs.delete(path).await {
            Ok(()) => info!(blob_path = %path, "removed blob after failed record write"),
            Err(e) => {
                warn!(blob_path = %path, error = %e, "orphaned blob needs manual cleanup");
                orphans.push(path.clone());
            }
        }
    }
    if !orphans.is_empty() {
        crate::metrics::increment_orphaned_blobs(orphans.len() as u64);
    }
    orphans
}

/// Runs the record write that follows a batch of uploads; if it fails, the
/// uploaded blobs are compensated before the error is returned.
pub async fn commit_or_compensate<T, E, F>(blobs: &dyn BlobStore, uploaded: &[String], write: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    match write.await {
        Ok(value) => Ok(value),
        Err(e) => {
            warn!(error = %e, blobs = uploaded.len(), "record write failed after upload");
            compensate(blobs, uploaded).await;
            Err(e)
        }
    }
}

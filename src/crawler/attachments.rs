//! Attachment storage
//!
//! File links found on a page (PDFs, spreadsheets, images) are downloaded through the
//! renderer and handed to an [`AttachmentStore`]. The filesystem store keys every file by
//! job and by the SHA-256 of its source URL, so re-downloads overwrite instead of piling up.

use crate::crawler::task::JobId;
use crate::storage::sanitize_key;
use crate::{FanoutError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use url::Url;

/// Reference to a stored attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    /// Where the file was downloaded from
    pub url: String,
    /// Storage key
    pub key: String,
    /// URL the stored file can be fetched from
    pub signed_url: String,
}

/// What is known about a file when it is uploaded
#[derive(Debug, Clone)]
pub struct AttachmentMetadata {
    pub job_id: JobId,
    pub source_url: String,
    pub content_type: Option<String>,
}

impl AttachmentMetadata {
    /// Lowercased extension of the source URL's last path segment, if any
    pub fn extension(&self) -> Option<String> {
        let parsed = Url::parse(&self.source_url).ok()?;
        let segment = parsed.path_segments()?.next_back()?;
        let (_, ext) = segment.rsplit_once('.')?;
        if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

/// Object storage for downloaded attachments
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    async fn upload(&self, bytes: &[u8], metadata: &AttachmentMetadata) -> Result<AttachmentRef>;
}

/// Storage key for an attachment: `{job}/{sha256(url)}[.ext]`
pub fn attachment_key(metadata: &AttachmentMetadata) -> String {
    let digest = hex::encode(Sha256::digest(metadata.source_url.as_bytes()));
    let job = sanitize_key(metadata.job_id.as_str());
    match metadata.extension() {
        Some(ext) => format!("{}/{}.{}", job, digest, ext),
        None => format!("{}/{}", job, digest),
    }
}

/// Stores attachments under a local directory
#[derive(Debug, Clone)]
pub struct FsAttachmentStore {
    root: PathBuf,
}

impl FsAttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl AttachmentStore for FsAttachmentStore {
    async fn upload(&self, bytes: &[u8], metadata: &AttachmentMetadata) -> Result<AttachmentRef> {
        let key = attachment_key(metadata);
        let path = self.root.join(&key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        let absolute = tokio::fs::canonicalize(&path).await?;
        let signed_url = Url::from_file_path(&absolute)
            .map_err(|_| FanoutError::Extraction {
                url: metadata.source_url.clone(),
                message: format!("cannot build file URL for {}", absolute.display()),
            })?
            .to_string();

        tracing::debug!(
            "Stored attachment {} ({} bytes) as {}",
            metadata.source_url,
            bytes.len(),
            key
        );

        Ok(AttachmentRef {
            url: metadata.source_url.clone(),
            key,
            signed_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn metadata(url: &str) -> AttachmentMetadata {
        AttachmentMetadata {
            job_id: JobId::new("local-1"),
            source_url: url.to_string(),
            content_type: Some("application/pdf".to_string()),
        }
    }

    #[test]
    fn test_extension() {
        assert_eq!(
            metadata("https://example.com/files/Report.PDF?x=1").extension(),
            Some("pdf".to_string())
        );
        assert_eq!(metadata("https://example.com/files/report").extension(), None);
        assert_eq!(metadata("https://example.com/").extension(), None);
    }

    #[test]
    fn test_attachment_key_is_stable() {
        let a = attachment_key(&metadata("https://example.com/a.pdf"));
        let b = attachment_key(&metadata("https://example.com/a.pdf"));
        let c = attachment_key(&metadata("https://example.com/b.pdf"));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("local_2d1/"));
        assert!(a.ends_with(".pdf"));
        // job prefix + 64 hex chars + ".pdf"
        assert_eq!(a.len(), "local_2d1/".len() + 64 + 4);
    }

    #[tokio::test]
    async fn test_fs_store_writes_file() {
        let dir = TempDir::new().unwrap();
        let store = FsAttachmentStore::new(dir.path());

        let reference = store
            .upload(b"%PDF-1.4", &metadata("https://example.com/a.pdf"))
            .await
            .unwrap();

        let stored = std::fs::read(dir.path().join(&reference.key)).unwrap();
        assert_eq!(stored, b"%PDF-1.4");
        assert_eq!(reference.url, "https://example.com/a.pdf");
        assert!(reference.signed_url.starts_with("file://"));
    }

    #[tokio::test]
    async fn test_fs_store_overwrites_same_url() {
        let dir = TempDir::new().unwrap();
        let store = FsAttachmentStore::new(dir.path());
        let meta = metadata("https://example.com/a.pdf");

        let first = store.upload(b"one", &meta).await.unwrap();
        let second = store.upload(b"two", &meta).await.unwrap();

        assert_eq!(first.key, second.key);
        let stored = std::fs::read(dir.path().join(&second.key)).unwrap();
        assert_eq!(stored, b"two");
    }
}

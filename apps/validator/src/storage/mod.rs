//! Object storage: résumé downloads and report uploads.

pub mod fetcher;
pub mod uploader;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use thiserror::Error;
use tracing::debug;

pub use fetcher::ResumeFetcher;
pub use uploader::ReportUploader;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage request failed: {0}")]
    Request(String),

    #[error("Storage returned status {0}")]
    Status(u16),

    #[error("Local file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Byte-level access to the configured bucket.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn download(&self, path: &str) -> Result<Bytes, StorageError>;

    /// Stores `body` at `path` and returns the HTTP status reported by the backend.
    async fn upload(&self, path: &str, body: Bytes, content_type: &str)
        -> Result<u16, StorageError>;
}

/// S3 / MinIO bucket.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn download(&self, path: &str) -> Result<Bytes, StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| StorageError::Request(format!("S3 download failed: {e}")))?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Request(format!("S3 body read failed: {e}")))?
            .into_bytes();

        debug!("Downloaded s3://{}/{} ({} bytes)", self.bucket, path, body.len());
        Ok(body)
    }

    async fn upload(
        &self,
        path: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<u16, StorageError> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| match e.raw_response() {
                Some(raw) => StorageError::Status(raw.status().as_u16()),
                None => StorageError::Request(format!("S3 upload failed: {e}")),
            })?;

        debug!("Uploaded s3://{}/{} ({size} bytes)", self.bucket, path);
        Ok(200)
    }
}

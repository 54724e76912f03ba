use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use audioforged_common::{Error, JobId, Result};
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as StorePath;
use object_store::signer::Signer;
use object_store::{
    Attribute, AttributeValue, Attributes, MultipartUpload, ObjectStore, PutMultipartOpts,
    PutPayload,
};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::BlobStore;
use crate::config::{HostRewrite, StorageConfig};

/// S3 rejects parts smaller than 5 MiB, except the last one.
const PART_SIZE: usize = 5 * 1024 * 1024;

/// [`BlobStore`] on S3 or an S3-compatible service.
pub struct S3BlobStore {
    inner: Arc<AmazonS3>,
    url_expiry: Duration,
    host_rewrite: Option<HostRewrite>,
}

impl S3BlobStore {
    /// Build a client from config. Credentials not given in config are read
    /// from the standard AWS environment variables.
    pub fn new(config: &StorageConfig) -> Result<Self> {
        Self::with_builder(AmazonS3Builder::from_env(), config)
    }

    /// Build a client on top of `builder`, with config taking precedence.
    pub fn with_builder(builder: AmazonS3Builder, config: &StorageConfig) -> Result<Self> {
        let mut builder = builder
            .with_bucket_name(&config.bucket)
            .with_region(&config.region)
            .with_virtual_hosted_style_request(false);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.with_endpoint(endpoint);
        }
        if config.dev {
            builder = builder.with_allow_http(true);
        }
        if let (Some(key_id), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            builder = builder
                .with_access_key_id(key_id)
                .with_secret_access_key(secret);
        }

        let store = builder
            .build()
            .map_err(|e| Error::storage(format!("failed to configure S3 client: {e}")))?;

        Ok(Self {
            inner: Arc::new(store),
            url_expiry: Duration::from_secs(config.url_expiry_secs),
            host_rewrite: config.effective_host_rewrite(),
        })
    }

    fn object_path(id: JobId) -> StorePath {
        StorePath::from(id.to_string())
    }
}

/// Copy `reader` into `upload` in parts of `part_size` bytes. The upload is
/// aborted on any failure so no incomplete upload is left in the bucket.
async fn write_parts<R>(
    upload: &mut dyn MultipartUpload,
    reader: &mut R,
    part_size: usize,
) -> Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut total_bytes: u64 = 0;
    loop {
        let mut part = Vec::with_capacity(part_size);
        let read = (&mut *reader)
            .take(part_size as u64)
            .read_to_end(&mut part)
            .await;
        match read {
            Ok(0) => break,
            Ok(n) => total_bytes += n as u64,
            Err(e) => {
                abort_upload(upload).await;
                return Err(Error::Io(e));
            }
        }
        if let Err(e) = upload.put_part(PutPayload::from(part)).await {
            abort_upload(upload).await;
            return Err(Error::storage(format!("upload part failed: {e}")));
        }
    }

    if let Err(e) = upload.complete().await {
        abort_upload(upload).await;
        return Err(Error::storage(format!("failed to complete upload: {e}")));
    }
    Ok(total_bytes)
}

async fn abort_upload(upload: &mut dyn MultipartUpload) {
    if let Err(e) = upload.abort().await {
        tracing::warn!("Failed to abort multipart upload: {}", e);
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn upload(&self, id: JobId, content_type: &str, mut file: File) -> Result<()> {
        let path = Self::object_path(id);

        let mut attributes = Attributes::new();
        attributes.insert(
            Attribute::ContentType,
            AttributeValue::from(content_type.to_string()),
        );
        let opts = PutMultipartOpts {
            attributes,
            ..Default::default()
        };

        let mut upload = self
            .inner
            .put_multipart_opts(&path, opts)
            .await
            .map_err(|e| Error::storage(format!("failed to start upload: {e}")))?;

        let total_bytes = write_parts(upload.as_mut(), &mut file, PART_SIZE).await?;

        tracing::debug!(job_id = %id, bytes = total_bytes, content_type, "Uploaded artifact");
        Ok(())
    }

    async fn signed_url(&self, id: JobId) -> Result<String> {
        let path = Self::object_path(id);
        let url = self
            .inner
            .signed_url(Method::GET, &path, self.url_expiry)
            .await
            .map_err(|e| Error::storage(format!("failed to sign URL: {e}")))?;

        let url = url.to_string();
        Ok(match &self.host_rewrite {
            Some(rewrite) => rewrite.apply(&url),
            None => url,
        })
    }
}

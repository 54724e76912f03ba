//! Blob storage for converted artifacts.
//!
//! Artifacts are stored under their job id. Clients never read the bucket
//! directly; they get a time-limited signed URL instead.

mod s3;

pub use s3::S3BlobStore;

use async_trait::async_trait;
use audioforged_common::{JobId, Result};
use tokio::fs::File;

/// Object storage holding converted files, addressed by job id.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload `file` as the artifact for `id`, tagged with `content_type`.
    async fn upload(&self, id: JobId, content_type: &str, file: File) -> Result<()>;

    /// A time-limited GET URL for the artifact of `id`.
    async fn signed_url(&self, id: JobId) -> Result<String>;
}

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub conversion: ConversionConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Worker pool sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct QueueConfig {
    /// Number of jobs converted in parallel.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Jobs buffered while every worker is busy. Submissions beyond this
    /// are rejected.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_concurrency() -> usize {
    5
}
fn default_queue_capacity() -> usize {
    100
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConversionConfig {
    /// Directory for in-progress output files.
    #[serde(default = "default_tmp_dir")]
    pub tmp_dir: PathBuf,

    /// Suffix temp files with the target extension.
    #[serde(default)]
    pub include_extension: bool,

    /// Explicit ffmpeg binary; looked up on PATH when unset.
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,
}

fn default_tmp_dir() -> PathBuf {
    PathBuf::from("/tmp")
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            tmp_dir: default_tmp_dir(),
            include_extension: false,
            ffmpeg_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_bucket")]
    pub bucket: String,

    #[serde(default = "default_region")]
    pub region: String,

    /// S3-compatible endpoint; AWS when unset.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Non-production deployment. Enables plain HTTP and the default host
    /// rewrite.
    #[serde(default)]
    pub dev: bool,

    /// Rewrites the host of signed URLs so clients outside the deployment
    /// network can reach them.
    #[serde(default)]
    pub host_rewrite: Option<HostRewrite>,

    /// Lifetime of signed retrieval URLs.
    #[serde(default = "default_url_expiry")]
    pub url_expiry_secs: u64,

    /// Static credentials. Falls back to the standard AWS environment.
    #[serde(default)]
    pub access_key_id: Option<String>,

    #[serde(default)]
    pub secret_access_key: Option<String>,
}

fn default_bucket() -> String {
    "audioforged".to_string()
}
fn default_region() -> String {
    "us-east-1".to_string()
}
fn default_url_expiry() -> u64 {
    24 * 60 * 60
}

impl StorageConfig {
    /// The rewrite to apply to signed URLs, if any.
    pub fn effective_host_rewrite(&self) -> Option<HostRewrite> {
        match (&self.host_rewrite, self.dev) {
            (Some(rewrite), _) => Some(rewrite.clone()),
            (None, true) => Some(HostRewrite::default()),
            (None, false) => None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            region: default_region(),
            endpoint: None,
            dev: false,
            host_rewrite: None,
            url_expiry_secs: default_url_expiry(),
            access_key_id: None,
            secret_access_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HostRewrite {
    pub from: String,
    pub to: String,
}

impl Default for HostRewrite {
    fn default() -> Self {
        Self {
            from: "s3_local".to_string(),
            to: "localhost".to_string(),
        }
    }
}

impl HostRewrite {
    /// Rewrite the first occurrence only, which is the URL's host.
    pub fn apply(&self, url: &str) -> String {
        url.replacen(&self.from, &self.to, 1)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("audioforged.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

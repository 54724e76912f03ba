mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./audioforged.toml",
        "./config.toml",
        "~/.config/audioforged/config.toml",
        "/etc/audioforged/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    // Return default config if no file found
    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.queue.concurrency == 0 {
        anyhow::bail!("queue.concurrency must be at least 1");
    }

    if config.queue.queue_capacity == 0 {
        anyhow::bail!("queue.queue_capacity must be at least 1");
    }

    if config.storage.bucket.trim().is_empty() {
        anyhow::bail!("storage.bucket cannot be empty");
    }

    if config.storage.url_expiry_secs == 0 {
        anyhow::bail!("storage.url_expiry_secs must be positive");
    }

    if !config.conversion.tmp_dir.exists() {
        tracing::warn!("Temp directory does not exist: {:?}", config.conversion.tmp_dir);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.queue.concurrency, 5);
        assert_eq!(config.queue.queue_capacity, 100);
        assert_eq!(config.conversion.tmp_dir, Path::new("/tmp"));
        assert!(!config.conversion.include_extension);
        assert!(config.conversion.ffmpeg_path.is_none());
        assert_eq!(config.storage.url_expiry_secs, 86_400);
        assert_eq!(config.database.path, Path::new("audioforged.db"));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_parse_partial_file() {
        let config: Config = toml::from_str(
            r#"
            [queue]
            concurrency = 2

            [storage]
            bucket = "converted"
            endpoint = "http://s3_local:9000"
            dev = true
            "#,
        )
        .unwrap();

        assert_eq!(config.queue.concurrency, 2);
        assert_eq!(config.queue.queue_capacity, 100);
        assert_eq!(config.storage.bucket, "converted");
        assert_eq!(
            config.storage.effective_host_rewrite(),
            Some(HostRewrite::default())
        );
    }

    #[test]
    fn test_host_rewrite() {
        let rewrite = HostRewrite::default();
        assert_eq!(
            rewrite.apply("http://s3_local:9000/bucket/id?X-Amz-Signature=abc"),
            "http://localhost:9000/bucket/id?X-Amz-Signature=abc"
        );
        assert_eq!(
            rewrite.apply("http://s3_local:9000/s3_local/s3_local-id"),
            "http://localhost:9000/s3_local/s3_local-id"
        );

        let storage = StorageConfig::default();
        assert!(storage.effective_host_rewrite().is_none());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.queue.concurrency = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.server.port = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.storage.bucket = " ".into();
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.storage.url_expiry_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 9090\n\n[database]\npath = \"/var/lib/jobs.db\"").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.database.path, Path::new("/var/lib/jobs.db"));
    }

    #[test]
    fn test_load_invalid_config_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[queue]\nconcurrency = 0").unwrap();
        assert!(load_config(file.path()).is_err());
    }
}

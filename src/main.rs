mod cli;

use audioforged::{
    config::{self, Config},
    conversion::{ConversionOrchestrator, JobQueue},
    server,
    service::ConverterService,
    storage::S3BlobStore,
};
use audioforged_av::{CommandBuilder, ProcessExecutableFactory};
use audioforged_db::{pool::init_pool, SqliteJobRepository};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn open_repository(config: &Config) -> Result<SqliteJobRepository> {
    let db_path = config.database.path.to_string_lossy();
    tracing::info!("Initializing database at {}", db_path);
    let pool = init_pool(&db_path)
        .with_context(|| format!("Failed to open database at {}", db_path))?;
    Ok(SqliteJobRepository::new(pool))
}

fn resolve_ffmpeg(config: &Config) -> PathBuf {
    match audioforged_av::get_tool_path("ffmpeg", config.conversion.ffmpeg_path.as_deref()) {
        Ok(path) => path,
        Err(e) => {
            tracing::warn!("{}; conversions will fail until ffmpeg is installed", e);
            PathBuf::from("ffmpeg")
        }
    }
}

fn build_service(config: &Config) -> Result<Arc<ConverterService>> {
    let repo = open_repository(config)?;

    // The work queue is in memory, so nothing from a previous run will resume.
    match repo.reset_orphaned_jobs() {
        Ok(count) if count > 0 => {
            tracing::info!("Failed {} orphaned conversion jobs from previous session", count);
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!("Failed to reset orphaned conversion jobs: {}", e);
        }
    }

    let blobs = S3BlobStore::new(&config.storage).context("Failed to configure blob storage")?;

    let commands = CommandBuilder::new(resolve_ffmpeg(config), &config.conversion.tmp_dir)
        .include_extension(config.conversion.include_extension);

    let orchestrator = ConversionOrchestrator::new(
        Arc::new(repo.clone()),
        Arc::new(blobs),
        Arc::new(ProcessExecutableFactory),
        commands,
    );

    Ok(Arc::new(ConverterService::new(
        Arc::new(repo),
        Arc::new(orchestrator),
        JobQueue::new(config.queue),
    )))
}

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // Override host/port from CLI if specified
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config::validate_config(&config)?;

    tracing::info!("Starting audioforged");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    let service = build_service(&config)?;
    server::start_server(config, service).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "audioforged=trace,audioforged_av=trace,audioforged_db=debug,tower_http=debug".to_string()
        } else {
            "audioforged=info,audioforged_av=info,audioforged_db=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Prune { days } => prune(cli.config.as_deref(), days),
        Commands::Version => {
            println!("audioforged {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let tool = audioforged_av::check_ffmpeg(config.conversion.ffmpeg_path.as_deref());

    if tool.available {
        print!("✓ {}", tool.name);
        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }
        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }
        println!();
        Ok(())
    } else {
        println!("✗ {}", tool.name);
        anyhow::bail!("ffmpeg is required for conversions; install it or set conversion.ffmpeg_path")
    }
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!(
                "  Workers: {} (queue capacity {})",
                config.queue.concurrency, config.queue.queue_capacity
            );
            println!("  Temp dir: {}", config.conversion.tmp_dir.display());
            println!("  Bucket: {} ({})", config.storage.bucket, config.storage.region);
            if let Some(ref endpoint) = config.storage.endpoint {
                println!("  Endpoint: {}", endpoint);
            }
            println!("  Database: {}", config.database.path.display());
        }
        None => {
            println!("No config file specified, using defaults");
            let config = Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
        }
    }

    Ok(())
}

fn prune(config_path: Option<&Path>, days: i64) -> Result<()> {
    if days < 0 {
        anyhow::bail!("--days cannot be negative");
    }

    let config = config::load_config_or_default(config_path)?;
    let repo = open_repository(&config)?;
    let pruned = repo.prune_terminal_jobs(days)?;
    println!("Pruned {} finished jobs older than {} days", pruned, days);
    Ok(())
}

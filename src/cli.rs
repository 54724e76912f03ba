use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "audioforged")]
#[command(author, version, about = "Asynchronous audio conversion service")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the conversion workers and the HTTP API
    Start {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check that ffmpeg is available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Delete finished job records older than the given age
    Prune {
        /// Age in days
        #[arg(long, default_value = "30")]
        days: i64,
    },

    /// Display version information
    Version,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start_overrides() {
        let cli = Cli::parse_from(["audioforged", "--verbose", "start", "--port", "9000"]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Start { host, port } => {
                assert!(host.is_none());
                assert_eq!(port, Some(9000));
            }
            _ => panic!("expected start"),
        }
    }

    #[test]
    fn test_parse_global_config() {
        let cli = Cli::parse_from(["audioforged", "check-tools", "--config", "/etc/a.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/a.toml")));
        assert!(matches!(cli.command, Commands::CheckTools));
    }

    #[test]
    fn test_parse_prune_default() {
        let cli = Cli::parse_from(["audioforged", "prune"]);
        assert!(matches!(cli.command, Commands::Prune { days: 30 }));
    }
}

//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// objects-dispatch - batch records to the objects API
#[derive(Parser, Debug)]
#[command(
    name = "objects-dispatch",
    author,
    version,
    about = "Batch newline-delimited JSON records to the objects API",
    long_about = "Reads records (one JSON object per line), groups them per collection \n\
                  and sends them in batches, flushing on size, count and time."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "OBJECTS_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "OBJECTS_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read records and send them in batches
    Send(SendArgs),

    /// Validate configuration without sending anything
    Validate(ValidateArgs),

    /// Display the effective configuration
    Info(InfoArgs),
}

/// Where the configuration comes from; flags override the file
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, env = "OBJECTS_CONFIG")]
    pub config: Option<PathBuf>,

    /// API write key
    #[arg(long, env = "OBJECTS_WRITE_KEY", hide_env_values = true)]
    pub write_key: Option<String>,

    /// Base endpoint URL
    #[arg(long, env = "OBJECTS_ENDPOINT")]
    pub endpoint: Option<String>,
}

/// Arguments for the `send` command
#[derive(Args, Debug, Clone)]
pub struct SendArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// NDJSON input file; stdin when omitted or `-`
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Collection for records that do not name one
    #[arg(long, env = "OBJECTS_COLLECTION")]
    pub collection: Option<String>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "OBJECTS_METRICS_PORT")]
    pub metrics_port: u16,

    /// Batch everything but keep requests in memory instead of sending them
    #[arg(long)]
    pub dry_run: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Args, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show the write key unmasked
    #[arg(long)]
    pub show_secrets: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_args_parse() {
        let cli = Cli::try_parse_from([
            "objects-dispatch",
            "-v",
            "send",
            "--write-key",
            "wk",
            "--input",
            "records.ndjson",
            "--collection",
            "users",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        let Commands::Send(args) = cli.command else {
            panic!("expected send");
        };
        assert_eq!(args.config.write_key.as_deref(), Some("wk"));
        assert_eq!(args.input, Some(PathBuf::from("records.ndjson")));
        assert_eq!(args.collection.as_deref(), Some("users"));
        assert_eq!(args.metrics_port, 0);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["objects-dispatch", "-q", "-v", "info"]);
        assert!(result.is_err());
    }
}

//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::cluster::{DEFAULT_REPLICATION_DELAY_SECS, DEFAULT_WORKERS};
use crate::config::{DEFAULT_APP, DEFAULT_NAMESPACE, DEFAULT_PORT};

/// Splunk bulk config - apply configuration stanzas over the management API.
#[derive(Parser, Debug)]
#[command(name = "splunk-conf")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Also write log output to a file at the specified path.
    #[arg(long, global = true, value_name = "PATH")]
    pub log: Option<PathBuf>,

    /// Log line format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply a change file to the target host.
    Apply(ApplyArgs),

    /// Check a change file offline, without contacting the host.
    Validate(ValidateArgs),
}

/// Arguments describing where and what to apply.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Path to the JSON (or YAML) change list.
    #[arg(short, long)]
    pub file: PathBuf,

    /// Conf type, e.g. props, savedsearches, macros (required unless --post-by-id).
    #[arg(short = 't', long = "type", required_unless_present = "post_by_id")]
    pub conf_type: Option<String>,

    /// Use the id field of each item as the request path; --type becomes optional.
    #[arg(long)]
    pub post_by_id: bool,

    /// Namespace root used to compose stanza paths.
    #[arg(long, default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// App used for items that do not name one.
    #[arg(long, default_value = DEFAULT_APP)]
    pub default_app: String,

    /// Only process the first N items (validates connectivity before a full run).
    #[arg(long, value_name = "N")]
    pub test_run: Option<usize>,
}

/// Arguments of the apply command.
#[derive(Args, Debug, Clone)]
pub struct ApplyArgs {
    /// Change list and path composition.
    #[command(flatten)]
    pub target: TargetArgs,

    /// Splunk management host.
    #[arg(long, env = "SPLUNK_HOST")]
    pub host: String,

    /// Management port.
    #[arg(long, env = "SPLUNK_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// URL scheme of the management port.
    #[arg(long, default_value = "https")]
    pub scheme: String,

    /// Bearer token (falls back to SPLUNK_TOKEN, also read from a .env file).
    #[arg(long, env = "SPLUNK_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Only update existing stanzas, skip creation on 404.
    #[arg(long)]
    pub update_only: bool,

    /// Request timeout in seconds.
    #[arg(long, default_value = "30", value_name = "SECONDS")]
    pub timeout: u64,

    /// Verify TLS certificates (self-signed certificates are accepted by default).
    #[arg(long)]
    pub verify_tls: bool,

    /// Validate that the changes replicated to all search head cluster members.
    #[arg(long)]
    pub shc: bool,

    /// Seconds to wait for replication before validating.
    #[arg(long, default_value_t = DEFAULT_REPLICATION_DELAY_SECS, value_name = "SECONDS")]
    pub shc_delay: u64,

    /// Number of concurrent member reads during validation.
    #[arg(long, default_value_t = DEFAULT_WORKERS, value_name = "N")]
    pub workers: usize,
}

/// Arguments of the validate command.
#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Change list and path composition.
    #[command(flatten)]
    pub target: TargetArgs,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// Log line format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Plain text lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl TargetArgs {
    /// Conf type to compose paths with; ignored in post-by-id mode without one.
    #[must_use]
    pub fn conf_type(&self) -> Option<String> {
        self.conf_type.clone().filter(|t| !t.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_required_without_post_by_id() {
        let result = Cli::try_parse_from(["splunk-conf", "apply", "--host", "sh1", "--file", "c.json"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_post_by_id_makes_type_optional() {
        let cli = Cli::try_parse_from([
            "splunk-conf", "apply", "--host", "sh1", "--file", "c.json", "--post-by-id",
        ])
        .unwrap();

        let Commands::Apply(args) = cli.command else {
            panic!("expected apply");
        };
        assert!(args.target.post_by_id);
        assert!(args.target.conf_type().is_none());
        assert_eq!(args.port, 8089);
        assert_eq!(args.shc_delay, 5);
        assert_eq!(args.workers, 8);
        assert_eq!(args.target.namespace, "servicesNS/nobody");
        assert_eq!(args.target.default_app, "search");
    }

    #[test]
    fn test_full_apply_flags() {
        let cli = Cli::try_parse_from([
            "splunk-conf",
            "--output",
            "json",
            "apply",
            "--host",
            "sh1",
            "--port",
            "18089",
            "--type",
            "savedsearches",
            "--file",
            "c.json",
            "--update-only",
            "--shc",
            "--shc-delay",
            "10",
            "--test-run",
            "3",
        ])
        .unwrap();

        assert!(matches!(cli.output, OutputFormat::Json));
        let Commands::Apply(args) = cli.command else {
            panic!("expected apply");
        };
        assert_eq!(args.port, 18089);
        assert_eq!(args.target.conf_type().as_deref(), Some("savedsearches"));
        assert!(args.update_only);
        assert!(args.shc);
        assert_eq!(args.shc_delay, 10);
        assert_eq!(args.target.test_run, Some(3));
    }

    #[test]
    fn test_validate_command() {
        let cli = Cli::try_parse_from(["splunk-conf", "validate", "--type", "macros", "-f", "m.json"])
            .unwrap();
        assert!(matches!(cli.command, Commands::Validate(_)));
    }
}

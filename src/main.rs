//! splunk-conf CLI entrypoint.
//!
//! This is the main entrypoint for the bulk configuration command-line tool.

use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Duration;

use splunk_bulk_config::apply::{ApplyEngine, BatchRunner};
use splunk_bulk_config::cli::{ApplyArgs, Cli, Commands, LogFormat, OutputFormatter, ValidateArgs};
use splunk_bulk_config::cluster::{ClusterCheckConfig, ClusterValidator};
use splunk_bulk_config::config::{
    ChangeFileParser, ChangeValidator, TargetDefaults, ValidationIssue, DEFAULT_PORT,
};
use splunk_bulk_config::error::Result;
use splunk_bulk_config::splunk::{ClientSettings, SplunkClient, TargetResolver};

use chrono::Utc;
use clap::Parser;
use tracing::{debug, info, info_span, Dispatch};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};
use uuid::Uuid;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    let dispatch = match build_dispatch(&cli) {
        Ok(dispatch) => dispatch,
        Err(e) => {
            eprintln!("Error: failed to open log file: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Logging is scoped to this invocation only
    tracing::dispatcher::with_default(&dispatch, || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                eprintln!("Failed to create async runtime: {e}");
                return ExitCode::FAILURE;
            }
        };

        match runtime.block_on(run(cli)) {
            Ok(code) => code,
            Err(e) => {
                eprintln!("Error: {e}");
                ExitCode::FAILURE
            }
        }
    })
}

/// Builds the log dispatcher: stderr plus an optional file, text or JSON lines.
fn build_dispatch(cli: &Cli) -> Result<Dispatch> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));

    let mut layers: Vec<BoxedLayer> = Vec::new();

    let stderr = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    layers.push(match cli.log_format {
        LogFormat::Json => stderr.json().boxed(),
        LogFormat::Text => stderr.boxed(),
    });

    if let Some(path) = &cli.log {
        let file = File::options().create(true).append(true).open(path)?;
        let to_file = fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(false);
        layers.push(match cli.log_format {
            LogFormat::Json => to_file.json().boxed(),
            LogFormat::Text => to_file.boxed(),
        });
    }

    let subscriber = Registry::default().with(layers).with(filter);
    Ok(Dispatch::new(subscriber))
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<ExitCode> {
    let formatter = OutputFormatter::new(cli.output);

    match cli.command {
        Commands::Apply(args) => cmd_apply(args, &formatter).await,
        Commands::Validate(args) => cmd_validate(&args, &formatter),
    }
}

/// Apply a change file.
async fn cmd_apply(args: ApplyArgs, formatter: &OutputFormatter) -> Result<ExitCode> {
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    let span = info_span!("run", %run_id);

    let target = &args.target;
    let parser = parser_for(&target.file);
    let token = resolve_token(args.token.clone(), &parser)?;
    let items = parser.load_limited(&target.file, target.test_run)?;

    let conf_type = target.conf_type();
    let has_conf_type = conf_type.is_some();
    let resolver = TargetResolver::new(
        &args.scheme,
        &args.host,
        args.port,
        conf_type,
        TargetDefaults::new(&target.namespace, target.default_app.clone()),
    )?;

    let client = SplunkClient::with_settings(
        &token,
        ClientSettings {
            timeout: Duration::from_secs(args.timeout),
            verify_tls: args.verify_tls,
        },
    )?;

    let engine = ApplyEngine::new(client, resolver, has_conf_type).with_update_only(args.update_only);
    let batch = BatchRunner::new(&engine)
        .with_span(span.clone())
        .run(&items)
        .await;

    let validation = if args.shc {
        let config = ClusterCheckConfig::new(Duration::from_secs(args.shc_delay), args.workers.max(1));
        ClusterValidator::new(engine.client(), engine.resolver().base().clone(), config)
            .with_span(span)
            .validate(&batch.outcomes)
            .await
    } else {
        None
    };

    println!(
        "{}",
        formatter.format_run(run_id, started_at, &batch, validation.as_ref())
    );

    Ok(if batch.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Check a change file without contacting any host.
fn cmd_validate(args: &ValidateArgs, formatter: &OutputFormatter) -> Result<ExitCode> {
    let target = &args.target;
    info!("Validating change file: {}", target.file.display());

    let items = parser_for(&target.file).load_limited(&target.file, target.test_run)?;

    let conf_type = target.conf_type();
    let validator = ChangeValidator::new(conf_type.is_some());
    let resolver = TargetResolver::new(
        "https",
        "localhost",
        DEFAULT_PORT,
        conf_type,
        TargetDefaults::new(&target.namespace, target.default_app.clone()),
    )?;

    let mut issues = validator.check_all(&items);
    let flagged: BTreeSet<usize> = issues.iter().map(|issue| issue.index).collect();

    for (index, item) in items.iter().enumerate() {
        if flagged.contains(&index) {
            continue;
        }
        match resolver.resolve(item) {
            Ok(resolved) => debug!("{} -> {}", item.title, resolved.stanza_path),
            Err(error) => issues.push(ValidationIssue {
                index,
                title: item.title.clone(),
                error,
            }),
        }
    }
    issues.sort_by_key(|issue| issue.index);

    println!("{}", formatter.format_issues(items.len(), &issues));

    Ok(if issues.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Creates a parser that looks for `.env` next to the change file.
fn parser_for(file: &Path) -> ChangeFileParser {
    ChangeFileParser::new().with_base_path(file.parent().unwrap_or_else(|| Path::new(".")))
}

/// Returns the explicit token, else the one from `.env` or the environment.
fn resolve_token(explicit: Option<String>, parser: &ChangeFileParser) -> Result<String> {
    if let Some(token) = explicit.filter(|t| !t.trim().is_empty()) {
        return Ok(token);
    }

    parser.load_dotenv()?;
    ChangeFileParser::new().load_dotenv()?;
    ChangeFileParser::get_token()
}

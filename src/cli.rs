//! Command-line interface for smellcheck.

use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::buffer::CodeBuffer;
use crate::client::ServiceClient;
use crate::config::{self, Config};
use crate::report;
use crate::session::{AnalysisSession, Status};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Bundled config template written by `init`.
const DEFAULT_TEMPLATE: &str = include_str!("templates/default.yaml");

/// Code smell analysis client.
///
/// Smellcheck sends source code to a code smell detection service and
/// reports the findings, code metrics and the model's smell prediction.
#[derive(Parser)]
#[command(name = "smellcheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command.
#[derive(Args)]
pub struct GlobalArgs {
    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Analysis service base URL (overrides config)
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Request timeout in milliseconds (overrides config)
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a source file for code smells
    #[command(visible_alias = "check")]
    Analyze(AnalyzeArgs),
    /// Check that the analysis service is up
    Health,
    /// Create a new smellcheck config file
    Init(InitArgs),
}

/// Arguments for the analyze command.
#[derive(Parser)]
pub struct AnalyzeArgs {
    /// File to analyze, or - for stdin
    pub path: PathBuf,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Exit non-zero when any smell is reported
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "smellcheck.yaml")]
    pub output: PathBuf,
}

/// Install the tracing subscriber. `RUST_LOG` wins over `-v`.
pub fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Load config and apply command-line overrides.
pub fn resolve_config(global: &GlobalArgs) -> anyhow::Result<Config> {
    let mut config = config::load(global.config.as_deref(), Path::new("."))?;
    if let Some(endpoint) = &global.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(timeout_ms) = global.timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    config::validate(&config)?;
    Ok(config)
}

fn read_source(path: &Path) -> anyhow::Result<(String, CodeBuffer)> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(("<stdin>".to_string(), CodeBuffer::new(text)));
    }
    let buffer = CodeBuffer::from_path(path)?;
    Ok((path.to_string_lossy().to_string(), buffer))
}

/// Run the analyze command.
pub async fn run_analyze(global: &GlobalArgs, args: &AnalyzeArgs) -> anyhow::Result<i32> {
    // Validate format
    if args.format != "pretty" && args.format != "json" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty' or 'json'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    let config = match resolve_config(global) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: invalid config: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    let (source, buffer) = match read_source(&args.path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: cannot read {:?}: {}", args.path, e);
            return Ok(EXIT_ERROR);
        }
    };
    if buffer.get().trim().is_empty() {
        warn!(source = %source, "source is empty");
    }

    let client = ServiceClient::new(&config)?;
    let session = AnalysisSession::new(client);

    let spinner = if args.format == "pretty" {
        let bar = ProgressBar::new_spinner();
        bar.set_style(ProgressStyle::default_spinner().template("{spinner} {msg}")?);
        bar.set_message("Analyzing...");
        bar.enable_steady_tick(Duration::from_millis(100));
        Some(bar)
    } else {
        None
    };

    let completion = session.analyze_and_wait(&buffer).await;
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }
    debug!(?completion, "analysis settled");

    let snapshot = session.snapshot();
    if args.format == "json" {
        report::write_json(&snapshot)?;
    } else {
        let source = format!("{} ({} lines)", source, buffer.line_count());
        let stdout = std::io::stdout();
        report::write_pretty(&mut stdout.lock(), &source, config.base_url(), &snapshot)?;
    }

    // Return appropriate exit code
    let results = &snapshot.results;
    let smelly = !results.findings().is_empty()
        || results.prediction().map(|p| p.has_smell).unwrap_or(false);
    match snapshot.status {
        Status::Failed { .. } => Ok(EXIT_ERROR),
        _ if args.strict && smelly => Ok(EXIT_FAILED),
        _ => Ok(EXIT_SUCCESS),
    }
}

/// Run the health command.
pub async fn run_health(global: &GlobalArgs) -> anyhow::Result<i32> {
    let config = match resolve_config(global) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: invalid config: {}", e);
            return Ok(EXIT_ERROR);
        }
    };
    let client = ServiceClient::new(&config)?;

    let health = match client.health().await {
        Ok(h) => h,
        Err(e) => {
            eprintln!("Error: {} unreachable: {}", client.base_url(), e);
            return Ok(EXIT_ERROR);
        }
    };

    // The banner is informational only.
    let info = client.info().await.ok();

    match &info {
        Some(info) if !info.message.is_empty() => {
            println!("{} v{} at {}", info.message, info.version, client.base_url())
        }
        _ => println!("{}", client.base_url()),
    }
    println!("  status:          {}", health.status);
    println!(
        "  ml model loaded: {}",
        if health.ml_model_loaded { "yes" } else { "no" }
    );

    if health.is_healthy() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILED)
    }
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    // Check if output already exists
    if args.output.exists() {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it or use --output to specify a different path");
        return Ok(EXIT_ERROR);
    }

    // Create output directory if needed
    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error: failed to create directory: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = std::fs::write(&args.output, DEFAULT_TEMPLATE) {
        eprintln!("Error: failed to write config: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {}", args.output.display());
    println!();
    println!("Next steps:");
    println!("  1. Point `endpoint` at your analysis service");
    println!(
        "  2. Run: smellcheck --config {} analyze <file.py>",
        args.output.display()
    );

    Ok(EXIT_SUCCESS)
}

//! TraceFetch CLI
//!
//! Command-line interface for fetching and exploring LangSmith traces.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use tracefetch::client::{parse_trace_url, url::resolve_public_target, ApiClient, PublicClient};
use tracefetch::config::LoggingConfig;
use tracefetch::crawler::PublicTraceCrawler;
use tracefetch::export::{write_run, write_trace_artifacts};
use tracefetch::models::TraceDocument;
use tracefetch::tree::{format_tree_pretty, TreeRenderOptions};
use tracefetch::Config;

/// TraceFetch - Rebuild LangSmith traces into navigable run trees
#[derive(Parser)]
#[command(name = "tracefetch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "TRACEFETCH_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (defaults to output.default_format from the config)
    #[arg(long, global = true)]
    format: Option<OutputFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    /// Summary plus ASCII tree
    #[default]
    Pretty,
    /// Full trace document
    Json,
    /// Parsed run records, unknown fields included
    Raw,
}

impl OutputFormat {
    fn from_config(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            "raw" => Self::Raw,
            _ => Self::Pretty,
        }
    }
}

#[derive(clap::Args)]
struct TreeArgs {
    /// Write tree.json, summary.json and NAVIGATION.md into this directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Show run ids on tree lines
    #[arg(long)]
    show_ids: bool,

    /// Hide runs deeper than this (root is depth 0)
    #[arg(long)]
    max_depth: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a trace with an API key and rebuild its run tree
    Tree {
        /// Trace id or LangSmith trace URL
        trace: String,

        #[command(flatten)]
        args: TreeArgs,
    },

    /// Fetch a publicly shared trace without an API key
    Public {
        /// Share URL or bare share token
        target: String,

        /// Stop after collecting this many runs
        #[arg(long)]
        max_runs: Option<usize>,

        #[command(flatten)]
        args: TreeArgs,
    },

    /// Fetch the full data of a single run
    Run {
        /// Run id
        run_id: String,

        /// Save to <dir>/runs/<run-id>.json instead of printing
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Read the run from this public share instead of the authenticated API
        #[arg(long)]
        share_token: Option<String>,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = parse_args(std::env::args_os()).unwrap_or_else(|e| e.exit());

    // Load configuration
    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.logging, cli.verbose);

    let format = cli
        .format
        .unwrap_or_else(|| OutputFormat::from_config(&config.output.default_format));

    // Execute command
    let result = match cli.command {
        Commands::Tree { trace, args } => run_tree(&config, &trace, &args, format).await,
        Commands::Public {
            target,
            max_runs,
            args,
        } => run_public(config, &target, max_runs, &args, format).await,
        Commands::Run {
            run_id,
            output_dir,
            share_token,
        } => run_single(&config, &run_id, output_dir.as_deref(), share_token.as_deref()).await,
        Commands::Config {
            command: ConfigCommands::Show,
        } => show_config(&config),
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// `.env` is loaded first so clap's `env` fallbacks can read it
fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    dotenvy::dotenv().ok();
    Cli::try_parse_from(args)
}

/// Logs go to stderr so stdout stays clean for piped output
fn init_logging(logging: &LoggingConfig, verbose: bool) {
    let log_level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    if logging.format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }
}

fn spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

async fn run_tree(
    config: &Config,
    trace: &str,
    args: &TreeArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let trace_id = if trace.contains("://") {
        parse_trace_url(trace)?.trace_id
    } else {
        trace.to_string()
    };

    let client = ApiClient::new(&config.api)?;
    let progress = spinner(format!("Fetching trace {trace_id}..."));
    let runs = client.fetch_trace_runs(&trace_id).await;
    progress.finish_and_clear();

    let doc = TraceDocument::assemble(trace_id, runs?);
    info!(trace_id = %doc.trace_id, runs = doc.total_runs, "fetched trace");
    emit(config, &doc, args, format)
}

async fn run_public(
    mut config: Config,
    target: &str,
    max_runs: Option<usize>,
    args: &TreeArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let locator = resolve_public_target(target)?;
    if let Some(max_runs) = max_runs {
        config.crawl.max_runs = max_runs;
    }

    let client = PublicClient::new(&config.api)?.with_org_slug(locator.org_slug.clone());
    let crawler = PublicTraceCrawler::new(client, config.crawl.clone());

    let progress = spinner(format!("Crawling public trace {}...", locator.trace_id));
    let outcome = crawler.crawl(&locator.trace_id).await;
    progress.finish_and_clear();
    let outcome = outcome?;

    if outcome.failed_batches > 0 {
        warn!(
            failed_batches = outcome.failed_batches,
            "some runs could not be fetched, the tree may be incomplete"
        );
    }
    if outcome.truncated {
        eprintln!(
            "Warning: stopped after {} runs; raise --max-runs to fetch more",
            outcome.runs.len()
        );
    }

    let doc = TraceDocument::assemble(locator.trace_id, outcome.runs);
    emit(&config, &doc, args, format)
}

fn emit(
    config: &Config,
    doc: &TraceDocument,
    args: &TreeArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    if let Some(dir) = &args.output_dir {
        let files = write_trace_artifacts(dir, doc)
            .with_context(|| format!("writing trace artifacts to {}", dir.display()))?;
        println!("Trace {} ({} runs) saved:", doc.trace_id, doc.total_runs);
        println!("  {}", files.tree.display());
        println!("  {}", files.summary.display());
        println!("  {}", files.navigation.display());
        println!("  {}/", files.runs_dir.display());
        return Ok(());
    }

    match format {
        OutputFormat::Pretty => {
            let options = TreeRenderOptions {
                show_ids: args.show_ids,
                max_depth: args.max_depth.or(config.output.max_depth),
            };
            println!(
                "{}",
                format_tree_pretty(doc.tree.as_ref(), &doc.summary, &options)
            );
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(doc)?),
        OutputFormat::Raw => println!("{}", serde_json::to_string_pretty(&doc.runs_flat)?),
    }
    Ok(())
}

async fn run_single(
    config: &Config,
    run_id: &str,
    output_dir: Option<&Path>,
    share_token: Option<&str>,
) -> anyhow::Result<()> {
    let progress = spinner(format!("Fetching run {run_id}..."));
    let run = match share_token {
        Some(token) => PublicClient::new(&config.api)?.fetch_run(token, run_id).await,
        None => ApiClient::new(&config.api)?.fetch_run(run_id).await,
    };
    progress.finish_and_clear();
    let run = run?;

    match output_dir {
        Some(dir) => {
            let path = write_run(dir, run_id, &run)?;
            println!("Run saved to {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&run)?),
    }
    Ok(())
}

fn show_config(config: &Config) -> anyhow::Result<()> {
    let mut shown = config.clone();
    shown.api.api_key = shown.api.api_key.as_deref().map(mask_secret);

    println!("{}", serde_json::to_string_pretty(&shown)?);
    match tracefetch::config::default_config_path() {
        Some(path) => eprintln!("Config file: {}", path.display()),
        None => eprintln!("Config file: (no config directory on this platform)"),
    }
    Ok(())
}

/// Keep only the last four characters visible
fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{tail}", "*".repeat(chars.len() - 4))
}

fn generate_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;

    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "tracefetch", &mut io::stdout());
}

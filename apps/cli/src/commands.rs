//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use sitebrief_core::pipeline::ProgressReporter;
use sitebrief_shared::{
    AppConfig, CompileConfig, init_config, load_config, validate_api_key,
};
use sitebrief_shared::types::RunReport;
use sitebrief_synth::{
    ExtractiveGenerator, Generator, HeuristicTokenCounter, OpenRouterGenerator,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// sitebrief — compile websites into voice-agent knowledge prompts.
#[derive(Parser)]
#[command(
    name = "sitebrief",
    version,
    about = "Compile a website into a token-budgeted knowledge prompt for a voice agent.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Crawl a website and compile its knowledge prompt.
    Compile {
        /// Seed URL (absolute or bare host, e.g. `shop.example`).
        url: String,

        /// Output directory for prompt.txt and report.json.
        #[arg(short, long, default_value = "sitebrief-out")]
        out: String,

        /// Maximum crawl depth (overrides config).
        #[arg(long)]
        max_depth: Option<u32>,

        /// Maximum pages fetched (overrides config).
        #[arg(long)]
        max_pages: Option<usize>,

        /// Token ceiling for the compiled prompt (overrides config).
        #[arg(long)]
        ceiling: Option<usize>,

        /// Use the deterministic extractive generator instead of OpenRouter.
        #[arg(long)]
        offline: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "sitebrief=info",
        1 => "sitebrief=debug",
        _ => "sitebrief=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Compile {
            url,
            out,
            max_depth,
            max_pages,
            ceiling,
            offline,
        } => cmd_compile(&url, &out, max_depth, max_pages, ceiling, offline).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

async fn cmd_compile(
    url: &str,
    out: &str,
    max_depth: Option<u32>,
    max_pages: Option<usize>,
    ceiling: Option<usize>,
    offline: bool,
) -> Result<()> {
    let config = load_config()?;

    // Merge CLI overrides into the runtime config
    let mut compile_config = CompileConfig::from(&config);
    if let Some(depth) = max_depth {
        compile_config.max_depth = depth;
    }
    if let Some(pages) = max_pages {
        compile_config.max_pages = pages;
    }
    if let Some(ceiling) = ceiling {
        compile_config.token_ceiling = ceiling;
    }

    let generator: Box<dyn Generator> = if offline {
        Box::new(ExtractiveGenerator)
    } else {
        validate_api_key(&config)?;
        let api_key = std::env::var(&config.openrouter.api_key_env)
            .map_err(|_| eyre!("missing {} in environment", config.openrouter.api_key_env))?;
        Box::new(OpenRouterGenerator::new(
            api_key,
            config.openrouter.default_model.clone(),
        ))
    };
    let tokens = HeuristicTokenCounter::new();

    info!(
        url,
        max_depth = compile_config.max_depth,
        max_pages = compile_config.max_pages,
        token_ceiling = compile_config.token_ceiling,
        offline,
        "compiling site"
    );

    let reporter = Arc::new(CliProgress::new());
    let report = sitebrief_core::pipeline::compile(
        url,
        &compile_config,
        generator.as_ref(),
        &tokens,
        reporter.clone(),
    )
    .await?;
    reporter.finish();

    let out_dir = write_outputs(out, &report)?;

    // Print summary
    println!();
    println!("  Prompt compiled successfully!");
    println!("  Run:        {}", report.run_id);
    println!("  Pages:      {} visited, {} skipped", report.metrics.pages_visited, report.metrics.pages_skipped);
    println!("  Duplicates: {}", report.metrics.duplicates_dropped);
    println!("  Facts:      {} units, {} generation failures", report.metrics.fact_units_synthesized, report.metrics.generation_failures);
    println!("  Tokens:     {} (truncated: {})", report.prompt.total_tokens, report.prompt.truncated);
    println!("  Output:     {}", out_dir.display());
    println!();

    Ok(())
}

/// Write prompt.txt and report.json under the output directory.
fn write_outputs(out: &str, report: &RunReport) -> Result<PathBuf> {
    let out_dir = PathBuf::from(out).join(report.run_id.to_string());
    std::fs::create_dir_all(&out_dir)
        .map_err(|e| eyre!("cannot create output directory '{}': {e}", out_dir.display()))?;

    let prompt_path = out_dir.join("prompt.txt");
    std::fs::write(&prompt_path, &report.prompt.text)
        .map_err(|e| eyre!("cannot write {}: {e}", prompt_path.display()))?;

    let report_path = out_dir.join("report.json");
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&report_path, json)
        .map_err(|e| eyre!("cannot write {}: {e}", report_path.display()))?;

    Ok(out_dir)
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .expect("valid template")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn page_fetched(&self, url: &str, visited: usize) {
        self.spinner.set_message(format!("Fetching [{visited}] {url}"));
    }

    fn block_synthesized(&self, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Synthesizing [{current}/{total}]"));
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

//! CLI command definitions, routing, and tracing setup.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use materializer_core::{Materializer, Outcome, build_spec, load_manifest, sink_from_config};
use materializer_shared::{
    AppConfig, DryRunConfig, Resource, ResourceMap, init_config, load_config, load_config_from,
};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// materialize — fetch and transform the resources a pipeline stage owns.
#[derive(Parser)]
#[command(
    name = "materialize",
    version,
    about = "Fetch and transform the resources a pipeline stage owns.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.materializer/materializer.toml).
    #[arg(long, global = true, env = "MATERIALIZER_CONFIG")]
    pub config: Option<PathBuf>,

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
    /// Run a stage over a resource map.
    Run {
        /// Stage manifest (TOML).
        #[arg(short, long)]
        manifest: PathBuf,

        /// Resource map (JSON object of key → resource).
        #[arg(short, long)]
        resources: PathBuf,

        /// Write the resulting map here instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Simulate the run without fetching anything.
        #[arg(long)]
        dry_run: bool,

        /// Simulated run duration (implies --dry-run).
        #[arg(long)]
        simulate_delay_ms: Option<u64>,

        /// Do not signal the notification endpoint.
        #[arg(long)]
        no_notify: bool,
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

/// Initialize tracing based on CLI flags. Logs go to stderr so stdout stays JSON.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "materializer=info",
        1 => "materializer=debug",
        _ => "materializer=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(cli.config.as_deref())?;

    match cli.command {
        Command::Run {
            manifest,
            resources,
            out,
            dry_run,
            simulate_delay_ms,
            no_notify,
        } => {
            let dry_run = dry_run_config(&config, dry_run, simulate_delay_ms, no_notify);
            cmd_run(&config, &manifest, &resources, out.as_deref(), &dry_run).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&config).await,
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    })
}

/// Merge dry-run flags over the `[dry_run]` config section.
fn dry_run_config(
    config: &AppConfig,
    dry_run: bool,
    simulate_delay_ms: Option<u64>,
    no_notify: bool,
) -> DryRunConfig {
    let mut resolved = DryRunConfig::from(&config.dry_run);
    if dry_run || simulate_delay_ms.is_some() {
        resolved.simulate = true;
    }
    if let Some(ms) = simulate_delay_ms {
        resolved.simulate_delay = Duration::from_millis(ms);
    }
    if no_notify {
        resolved.suppress_notification = true;
    }
    resolved
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(
    config: &AppConfig,
    manifest_path: &Path,
    resources_path: &Path,
    out: Option<&Path>,
    dry_run: &DryRunConfig,
) -> Result<()> {
    let manifest = load_manifest(manifest_path)?;
    let spec = build_spec(&manifest, &config.transport)?;
    let stage = manifest
        .stage
        .clone()
        .unwrap_or_else(|| config.notification.stage_name.clone());
    let sink = sink_from_config(&config.notification)?;

    let current = read_resource_map(resources_path)?;
    let materializer = Materializer::new(stage, spec, sink);

    if materializer.spec().is_empty() {
        warn!(manifest = %manifest_path.display(), "manifest declares no units");
    }
    info!(
        stage = materializer.stage(),
        units = materializer.spec().len(),
        resources = current.len(),
        simulate = dry_run.simulate,
        "running stage"
    );

    let processed = materializer.process(&current, dry_run).await;
    // The runtime goes away when `run` returns; let the notification settle first.
    materializer
        .flush_notifications(config.notification.connect_timeout())
        .await;
    let outcome = processed?;

    eprintln!("{}", outcome.note());
    if let Outcome::Completed {
        updated, skipped, ..
    } = &outcome
    {
        eprintln!("  Updated: {}", updated.join(", "));
        eprintln!("  Skipped: {}", skipped.join(", "));
    }

    // A simulated run leaves the caller's map as it was.
    let result = outcome.into_resources().unwrap_or(current);
    write_resource_map(&result, out)
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Resource map I/O
// ---------------------------------------------------------------------------

fn read_resource_map(path: &Path) -> Result<ResourceMap> {
    let content = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("cannot read resource map {}", path.display()))?;
    parse_resource_map(&content)
        .wrap_err_with(|| format!("invalid resource map {}", path.display()))
}

fn parse_resource_map(content: &str) -> Result<ResourceMap> {
    let entries: BTreeMap<String, Resource> =
        serde_json::from_str(content).map_err(|e| eyre!("{e}"))?;
    Ok(entries
        .into_iter()
        .map(|(key, resource)| (key, Arc::new(resource)))
        .collect())
}

fn write_resource_map(map: &ResourceMap, out: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(map)?;
    match out {
        Some(path) => std::fs::write(path, format!("{json}\n"))
            .wrap_err_with(|| format!("cannot write {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

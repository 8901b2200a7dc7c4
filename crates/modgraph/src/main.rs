//! modgraph
//!
//! Validates and graphs the module build descriptors of a plugins tree.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use modgraph::cli::{self, GraphFormat, Outcome, ReportFormat, SingleConfig};
use modgraph::config::{BuildSelection, Config};
use modgraph::loader::{LoadOptions, ManifestSet};

/// Plugin module manifest toolkit.
#[derive(Parser, Debug)]
#[command(name = "modgraph", author, version, about, long_about = None)]
struct Args {
    /// Maximum descriptors parsed concurrently.
    #[arg(long, global = true)]
    jobs: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse, resolve and validate every manifest under a plugins root.
    Validate {
        root: PathBuf,
        /// Host module registry (TOML). Defaults to the built-in stub.
        #[arg(long)]
        registry: Option<PathBuf>,
        /// Build configurations to resolve under.
        #[arg(long, value_enum)]
        config: Option<BuildSelection>,
        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
    },
    /// Print the resolved dependency graph.
    Graph {
        root: PathBuf,
        #[arg(long, value_enum, default_value_t = SingleConfig::Editor)]
        config: SingleConfig,
        #[arg(long)]
        registry: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = GraphFormat::Json)]
        format: GraphFormat,
    },
    /// List discovered manifests.
    List { root: PathBuf },
    /// Print a build order over the plugin modules.
    Order {
        root: PathBuf,
        #[arg(long, value_enum, default_value_t = SingleConfig::Editor)]
        config: SingleConfig,
        #[arg(long)]
        registry: Option<PathBuf>,
    },
    /// Print one module's descriptor in canonical form.
    Show { root: PathBuf, module: String },
}

impl Command {
    fn root(&self) -> &Path {
        match self {
            Command::Validate { root, .. }
            | Command::Graph { root, .. }
            | Command::List { root }
            | Command::Order { root, .. }
            | Command::Show { root, .. } => root,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let args = Args::parse();
    match run(args).await {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(Outcome::Failed.exit_code())
        }
    }
}

async fn run(args: Args) -> Result<Outcome> {
    let config = Config::from_env().context("failed to load configuration")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    let options = LoadOptions {
        jobs: args.jobs.unwrap_or(config.jobs).max(1),
        cancel,
    };
    let Some(set) = cli::load_set(args.command.root(), &options).await? else {
        eprintln!("load cancelled");
        return Ok(Outcome::Failed);
    };

    let stdout = std::io::stdout();
    let stderr = std::io::stderr();
    let mut out = stdout.lock();
    let mut err = stderr.lock();
    let outcome = dispatch(&args.command, &config, &set, &mut out, &mut err)?;
    out.flush()?;
    Ok(outcome)
}

fn dispatch(
    command: &Command,
    config: &Config,
    set: &ManifestSet,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<Outcome> {
    let registry_path = |flag: &Option<PathBuf>| flag.clone().or_else(|| config.registry.clone());

    match command {
        Command::Validate {
            registry,
            config: selection,
            format,
            ..
        } => {
            let registry = cli::load_registry(registry_path(registry).as_deref())?;
            let selection = selection.unwrap_or(config.default_config);
            info!(%selection, modules = set.len(), "validating");
            cli::cmd_validate(out, set, &registry, selection, *format)
        }
        Command::Graph {
            config: single,
            registry,
            format,
            ..
        } => {
            let registry = cli::load_registry(registry_path(registry).as_deref())?;
            cli::cmd_graph(out, err, set, &registry, *single, *format)
        }
        Command::List { .. } => cli::cmd_list(out, set),
        Command::Order {
            config: single,
            registry,
            ..
        } => {
            let registry = cli::load_registry(registry_path(registry).as_deref())?;
            cli::cmd_order(out, err, set, &registry, *single)
        }
        Command::Show { module, .. } => cli::cmd_show(out, err, set, module),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use freshet::config::Config;
use freshet::filter::{Filter, RuleKind, RuleScope};
use freshet::models::Job;
use freshet::scheduler::distribute_jobs;

#[derive(Parser)]
#[command(
    name = "freshet",
    version,
    about = "Feed refresh engine: host-fair scheduling, entry filtering and reconciliation",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); defaults to the configured format
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// TOML configuration file; the environment is used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print jobs in host-fair refresh order
    Distribute {
        /// JSON file holding an array of {user_id, feed_id, feed_url}
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Validate block/keep filter rule text
    CheckRules {
        /// File with one `field=pattern` rule per line
        #[arg(short, long)]
        file: PathBuf,

        /// Rule set the text belongs to
        #[arg(long, value_enum, default_value_t = ScopeArg::User)]
        scope: ScopeArg,

        /// Whether the rules block or keep entries
        #[arg(long, value_enum, default_value_t = KindArg::Block)]
        kind: KindArg,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum ScopeArg {
    User,
    Feed,
    Category,
}

impl From<ScopeArg> for RuleScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::User => RuleScope::User,
            ScopeArg::Feed => RuleScope::Feed,
            ScopeArg::Category => RuleScope::Category,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Block,
    Keep,
}

impl From<KindArg> for RuleKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Block => RuleKind::Block,
            KindArg::Keep => RuleKind::Keep,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());

    // Initialize tracing/logging
    setup_tracing(&log_format, &config.logging.level, cli.verbose)?;

    if let Err(e) = freshet::metrics::init_metrics() {
        tracing::warn!(error = %e, "Metrics initialization failed");
    }

    match cli.command {
        Commands::Distribute { input } => {
            tracing::info!(input = %input.display(), "Starting distribute command");
            distribute(&input)?;
        }

        Commands::CheckRules { file, scope, kind } => {
            tracing::info!(file = %file.display(), "Starting check-rules command");
            check_rules(&file, scope.into(), kind.into())?;
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    config.validate()?;
    Ok(config)
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("freshet=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("freshet={level},warn")))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}

fn distribute(input: &Path) -> Result<()> {
    let content = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read jobs file: {}", input.display()))?;
    let jobs: Vec<Job> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse jobs file: {}", input.display()))?;

    let total = jobs.len();
    let ordered = distribute_jobs(jobs);
    tracing::info!(jobs = total, "Jobs distributed");

    println!("{}", serde_json::to_string_pretty(&ordered)?);
    Ok(())
}

fn check_rules(file: &Path, scope: RuleScope, kind: RuleKind) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read rules file: {}", file.display()))?;

    let filter = Filter::parse(&text, scope, kind)?;
    for rule in filter.rules() {
        println!("{rule}");
    }
    println!("{} {scope} {kind} rule(s) OK", filter.len());
    Ok(())
}

//! Fleetward CLI - freeze, thaw and migrate branches across a GitHub
//! organization.

mod commands;
mod config;
mod progress;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use console::Term;
use fleetward::{MigrationAction, MigrationStrategy};
use tracing_subscriber::EnvFilter;

use crate::commands::limits::OutputFormat;

#[derive(Parser)]
#[command(name = "fleetward")]
#[command(version)]
#[command(about = "Fleet-wide branch and protection migrations for GitHub organizations")]
#[command(
    long_about = "Fleetward moves every repository of a GitHub organization through the same \
branch transition: freezing `next` and `main` for a release event, thawing `main` afterwards, \
or promoting `next` to `main` while keeping a protected snapshot of the old `main`. \
Without --all, commands act on the configured sandbox repository only."
)]
#[command(after_long_help = r#"EXAMPLES
    Freeze the sandbox repository:
        $ fleetward freeze

    Preview a fleet-wide migration:
        $ fleetward migrate --all --dry-run

    Thaw every repository that has at least one release:
        $ fleetward thaw --all --release-gated

    Migrate one repository using promote-in-place:
        $ fleetward migrate --repo my-org/widget --strategy promote-in-place

    List the repositories a fleet run would touch:
        $ fleetward list --match '/phantom-'

    Generate shell completions:
        $ fleetward completions bash > ~/.local/share/bash-completion/completions/fleetward

CONFIGURATION
    Fleetward reads configuration from:
      1. ~/.config/fleetward/config.toml (or $XDG_CONFIG_HOME/fleetward/config.toml)
      2. ./fleetward.toml
      3. Environment variables (FLEETWARD_ prefix, e.g., FLEETWARD_FLEET__MAX_PAGES)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    FLEETWARD_GITHUB_TOKEN    GitHub personal access token (GITHUB_TOKEN also works)
    FLEETWARD_GITHUB__ORG     Organization to operate on
    RUST_LOG                  Log filter when output is not a terminal
"#)]
struct Cli {
    /// Log line format when output is not a terminal
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Lock `next` and `main` with the frozen protection rule
    Freeze {
        #[command(flatten)]
        target: TargetOptions,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Return `main` to normal protection
    Thaw {
        #[command(flatten)]
        target: TargetOptions,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Promote `next` to `main`, keeping `main-archive` as a snapshot
    Migrate {
        /// Migration strategy (default from config or archive-and-recreate)
        #[arg(short = 's', long)]
        strategy: Option<MigrationStrategy>,

        #[command(flatten)]
        target: TargetOptions,
        #[command(flatten)]
        run: RunArgs,
    },
    /// List the organization's repositories after filtering
    List {
        #[command(flatten)]
        filters: FilterOptions,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Show current rate limit status
    Limits {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
    /// Generate man page(s)
    Man {
        /// Output directory for man pages (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Organization listing filters.
#[derive(Debug, Clone, Default, clap::Args)]
struct FilterOptions {
    /// Organization to operate on (default from config)
    #[arg(long)]
    org: Option<String>,

    /// Skip repositories whose owner/name matches this regex
    #[arg(short = 'x', long)]
    exclude: Option<String>,

    /// Keep only repositories whose owner/name matches this regex
    #[arg(short = 'm', long = "match")]
    include: Option<String>,

    /// Maximum number of pages to request (default from config or 20)
    #[arg(long)]
    max_pages: Option<u32>,

    /// Repositories per page, 1-100 (default from config or 30)
    #[arg(long)]
    per_page: Option<u32>,

    /// Only repositories that are not archived and have at least one release
    #[arg(short = 'r', long)]
    release_gated: bool,
}

/// Which repositories a run acts on.
#[derive(Debug, Clone, Default, clap::Args)]
struct TargetOptions {
    /// Act on every repository of the organization
    #[arg(short = 'A', long, conflicts_with = "repo")]
    all: bool,

    /// Act on this repository only (default: the configured sandbox repository)
    #[arg(long, value_name = "OWNER/NAME")]
    repo: Option<fleetward::RepoId>,

    #[command(flatten)]
    filters: FilterOptions,
}

/// Options shared by freeze, thaw and migrate.
#[derive(Debug, Clone, Default, clap::Args)]
struct RunArgs {
    /// Dry run - show what would be done without making changes
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Pause between repositories in milliseconds, 0 disables (default from config or 1000)
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Exit with status 1 when any repository fails
    #[arg(long)]
    fail_on_error: bool,

    /// Disable proactive rate limiting (may cause API throttling)
    #[arg(short = 'R', long)]
    no_rate_limit: bool,

    /// Output format for the run report
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

fn init_tracing(format: LogFormat) {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("fleetward=info,fleetward_cli=info"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Handle commands that need neither configuration nor the network first
    match &cli.command {
        Commands::Completions { shell } => {
            commands::meta::handle_completions(*shell)?;
            return Ok(());
        }
        Commands::Man { output } => {
            commands::meta::handle_man(output.clone())?;
            return Ok(());
        }
        _ => {}
    }

    // Progress bars replace log lines on a terminal unless JSON was asked for
    if !Term::stdout().is_term() || cli.log_format == LogFormat::Json {
        init_tracing(cli.log_format);
    }

    let config = config::Config::load()?;

    shutdown::setup_shutdown_handler();

    match cli.command {
        Commands::Freeze { target, run } => {
            commands::run::handle_run(MigrationAction::Freeze, None, target, run, &config).await?;
        }
        Commands::Thaw { target, run } => {
            commands::run::handle_run(MigrationAction::Thaw, None, target, run, &config).await?;
        }
        Commands::Migrate {
            strategy,
            target,
            run,
        } => {
            commands::run::handle_run(
                MigrationAction::MigrateNextToMain,
                strategy,
                target,
                run,
                &config,
            )
            .await?;
        }
        Commands::List { filters, output } => {
            commands::list::handle_list(filters, output, &config).await?;
        }
        Commands::Limits { output } => {
            commands::limits::handle_limits(output, &config).await?;
        }
        Commands::Completions { .. } | Commands::Man { .. } => {}
    }
    Ok(())
}

//! Relsync CLI - runs and inspects the release metadata updater.

mod commands;
mod config;
mod progress;
mod shutdown;

use clap::{Parser, Subcommand};
use console::Term;
use tracing_subscriber::EnvFilter;

use crate::commands::output::OutputFormat;

#[derive(Parser)]
#[command(name = "relsync")]
#[command(version)]
#[command(about = "Keeps a store of vendor JDK release metadata in sync with upstream")]
#[command(
    long_about = "Relsync reads vendor JDK releases from upstream GitHub repositories, \
reconciles them against a stored snapshot, and commits changes through a \
checksum-guarded store so that several updaters can share one database."
)]
#[command(after_long_help = r#"EXAMPLES
    Run the updater until Ctrl+C:
        $ relsync run

    Rebuild the snapshot from scratch once:
        $ relsync sync full

    Re-fetch one release by name:
        $ relsync refresh jdk-21.0.3+9

    Show what is stored:
        $ relsync status --output json

CONFIGURATION
    Relsync reads configuration from:
      1. ~/.config/relsync/config.toml (or $XDG_CONFIG_HOME/relsync/config.toml)
      2. ./relsync.toml
      3. Environment variables (RELSYNC_ prefix, `__` between sections)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    RELSYNC_DATABASE__URL       Database connection string (default: ~/.local/state/relsync/relsync.db)
    RELSYNC_GITHUB__TOKEN       GitHub token (GITHUB_TOKEN also works)
    RELSYNC_UPDATER__<KEY>      Any [updater] setting, e.g. RELSYNC_UPDATER__RECONCILE_PERIOD_MINUTES
    GITHUB_THRESHOLD            Quota soft threshold
    GITHUB_THRESHOLD_HARD_FLOOR Quota hard floor
    DISABLE_UPDATER             Do not start the scheduler
    UPDATE_DAY_CUTOFF           Age in days after which prereleases are not re-fetched
    UPDATE_ADOPTOPENJDK         Also fetch vendors excluded from full sync
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full-sync and reconcile jobs until interrupted
    #[cfg(feature = "github")]
    Run,
    /// Run one sync pass and commit the result
    #[cfg(feature = "github")]
    Sync {
        #[command(subcommand)]
        action: SyncAction,
    },
    /// Re-fetch every release with the given name
    #[cfg(feature = "github")]
    Refresh {
        /// Release name, e.g. jdk-17.0.2+8
        name: String,
    },
    /// Show the stored checksum and release counts
    Status {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Show the remaining GraphQL quota
    #[cfg(feature = "github")]
    Limits {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[cfg(feature = "github")]
#[derive(Subcommand)]
enum SyncAction {
    /// Fetch every tracked version from scratch
    Full {
        /// Only fetch general-availability releases
        #[arg(long)]
        releases_only: bool,
    },
    /// Fetch only what changed since the stored snapshot
    Reconcile,
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Rollback the last migration
    Down,
    /// Show migration status
    Status,
    /// Fresh install - drop all tables and reapply migrations
    Fresh,
}

impl Commands {
    fn is_long_running(&self) -> bool {
        match self {
            #[cfg(feature = "github")]
            Commands::Run => true,
            _ => false,
        }
    }
}

/// Create the parent directory of a file-backed SQLite database.
fn ensure_sqlite_dir(database_url: &str) -> std::io::Result<()> {
    let Some(db_path) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    // Strip query parameters (e.g., ?mode=rwc) before path operations
    let db_path = db_path.split('?').next().unwrap_or(db_path);
    let db_path = std::path::Path::new(db_path);

    if db_path.is_relative() && !db_path.as_os_str().is_empty() {
        tracing::warn!(
            "Database path '{}' is relative - behavior depends on current directory. \
             Consider using an absolute path.",
            db_path.display()
        );
    }

    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    shutdown::setup_shutdown_handler();

    let cli = Cli::parse();

    // Progress bars on a TTY, structured logging otherwise and for the updater.
    if cli.command.is_long_running() || !Term::stdout().is_term() {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("relsync=info,relsync_cli=info"),
        };

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    // Load configuration (config file -> env vars -> defaults)
    let config = config::Config::load();

    if let Commands::Completions { shell } = &cli.command {
        commands::meta::handle_completions(*shell)?;
        return Ok(());
    }

    let database_url = config
        .database_url()
        .ok_or("could not determine a database location; set RELSYNC_DATABASE__URL")?;
    ensure_sqlite_dir(&database_url)?;

    match cli.command {
        #[cfg(feature = "github")]
        Commands::Run => {
            commands::run::handle_run(&config, &database_url).await?;
        }
        #[cfg(feature = "github")]
        Commands::Sync { action } => {
            commands::sync::handle_sync(action, &config, &database_url).await?;
        }
        #[cfg(feature = "github")]
        Commands::Refresh { name } => {
            commands::refresh::handle_refresh(&name, &config, &database_url).await?;
        }
        Commands::Status { output } => {
            commands::status::handle_status(output, &config, &database_url).await?;
        }
        #[cfg(feature = "github")]
        Commands::Limits { output } => {
            commands::limits::handle_limits(output, &config).await?;
        }
        Commands::Migrate { action } => {
            commands::migrate::handle_migrate(action, &database_url).await?;
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}

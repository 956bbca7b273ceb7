#[cfg(feature = "github")]
use std::error::Error;
#[cfg(feature = "github")]
use std::sync::Arc;

use console::Term;
#[cfg(feature = "github")]
use relsync::graphql::GraphQlClient;
#[cfg(feature = "github")]
use relsync::sync::ProgressCallback;
#[cfg(feature = "github")]
use relsync::{
    CommitOutcome, DataStore, GraphQlReleaseSource, ReleaseSource, SeaOrmStore, Updater,
};
use relsync::short_error_message;
use sea_orm::DatabaseConnection;

#[cfg(feature = "github")]
use crate::config::Config;

/// Exit status when the database cannot be opened.
const EXIT_DATABASE_UNAVAILABLE: i32 = 2;

/// Connect and migrate, exiting the process when the database is unreachable.
pub(crate) async fn connect_or_exit(database_url: &str) -> DatabaseConnection {
    match relsync::connect_and_migrate(database_url).await {
        Ok(db) => db,
        Err(e) => {
            if Term::stderr().is_term() {
                eprintln!("Failed to open database: {}", short_error_message(&e));
            } else {
                tracing::error!(error = %e, "Failed to open database");
            }
            std::process::exit(EXIT_DATABASE_UNAVAILABLE);
        }
    }
}

/// GraphQL-backed release source built from the configuration.
#[cfg(feature = "github")]
pub(crate) fn release_source(config: &Config) -> Result<Arc<dyn ReleaseSource>, Box<dyn Error>> {
    if config.github.token.is_none() {
        tracing::warn!("No GitHub token configured; the GraphQL API rejects anonymous queries");
    }
    let client = GraphQlClient::with_reqwest(config.client_settings())?;
    Ok(Arc::new(GraphQlReleaseSource::new(client)))
}

/// Open the store and load the committed snapshot into a new updater.
#[cfg(feature = "github")]
pub(crate) async fn build_updater(
    config: &Config,
    database_url: &str,
    on_progress: Option<ProgressCallback>,
) -> Result<Updater, Box<dyn Error>> {
    let source = release_source(config)?;
    let db = connect_or_exit(database_url).await;
    let store: Arc<dyn DataStore> = Arc::new(SeaOrmStore::new(db));
    Ok(Updater::new(source, store, config.updater.clone(), on_progress).await)
}

/// One-line summary of a commit for the terminal.
#[cfg(feature = "github")]
pub(crate) fn describe_outcome(outcome: &CommitOutcome) -> String {
    let committed = outcome.committed();
    let releases = committed.snapshot.release_count();
    let checksum = committed
        .token
        .as_ref()
        .map_or("none", |token| token.checksum.as_str());

    match outcome {
        CommitOutcome::Unchanged(_) => format!("Snapshot unchanged ({} releases)", releases),
        CommitOutcome::Committed(_) => {
            format!("Committed {} releases (checksum {})", releases, checksum)
        }
        CommitOutcome::Superseded(_) => format!(
            "Another updater committed first; kept its {} releases (checksum {})",
            releases, checksum
        ),
        CommitOutcome::Resynced(_) => format!(
            "Rewrote the stored snapshot with a fresh checksum ({} releases, checksum {})",
            releases, checksum
        ),
    }
}

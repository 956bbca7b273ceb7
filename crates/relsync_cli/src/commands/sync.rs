use std::error::Error;
use std::sync::Arc;

use relsync::ReleaseFilterType;

use crate::SyncAction;
use crate::commands::shared::{build_updater, describe_outcome};
use crate::config::Config;
use crate::progress::ProgressReporter;

/// Run a single sync pass and commit its result.
pub(crate) async fn handle_sync(
    action: SyncAction,
    config: &Config,
    database_url: &str,
) -> Result<(), Box<dyn Error>> {
    let reporter = Arc::new(ProgressReporter::new());
    let updater = build_updater(config, database_url, Some(reporter.as_callback())).await?;

    let result = match action {
        SyncAction::Full { releases_only } => {
            let filter = if releases_only {
                ReleaseFilterType::ReleasesOnly
            } else {
                ReleaseFilterType::All
            };
            updater.run_full_sync(filter).await
        }
        SyncAction::Reconcile => updater.run_reconcile().await,
    };
    reporter.finish();

    let outcome = result?;
    println!("{}", describe_outcome(&outcome));
    Ok(())
}

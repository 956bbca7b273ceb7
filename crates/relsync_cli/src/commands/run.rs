use std::error::Error;
use std::sync::Arc;

use crate::commands::shared::build_updater;
use crate::config::Config;
use crate::progress::ProgressReporter;
use crate::shutdown;

/// Run the scheduler until Ctrl+C.
pub(crate) async fn handle_run(config: &Config, database_url: &str) -> Result<(), Box<dyn Error>> {
    let reporter = Arc::new(ProgressReporter::logging());
    let updater = build_updater(config, database_url, Some(reporter.as_callback())).await?;

    let snapshot = updater.snapshot();
    tracing::info!(
        releases = snapshot.release_count(),
        versions = ?snapshot.versions(),
        full_sync_hours = config.updater.full_sync_period_hours,
        reconcile_minutes = config.updater.reconcile_period_minutes,
        "Starting updater"
    );

    updater.run(shutdown::shutdown_requested()).await;

    tracing::info!(
        releases = updater.snapshot().release_count(),
        "Updater stopped"
    );
    Ok(())
}

use relsync::sync::SyncProgress;

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: SyncProgress) {
        match event {
            SyncProgress::FullSyncStarted { filter, versions } => {
                tracing::info!(filter = ?filter, versions, "Starting full sync");
            }

            SyncProgress::VersionFetched {
                version,
                releases,
                unmapped,
            } => {
                tracing::info!(version, releases, unmapped, "Fetched version");
            }

            SyncProgress::VersionFailed { version, error } => {
                tracing::warn!(version, error = %error, "Failed to fetch version");
            }

            SyncProgress::CopiedOver { version, count } => {
                tracing::debug!(version, count, "Copied over releases");
            }

            SyncProgress::FullSyncComplete { releases } => {
                tracing::info!(releases, "Full sync complete");
            }

            SyncProgress::ReconcileStarted {
                versions,
                pending_refresh,
            } => {
                tracing::debug!(versions, pending_refresh, "Starting reconciliation");
            }

            SyncProgress::VersionReconciled {
                version,
                removed,
                added,
                refreshed,
                quarantined,
            } => {
                if removed + added + refreshed + quarantined > 0 {
                    tracing::info!(version, removed, added, refreshed, quarantined, "Reconciled version");
                } else {
                    tracing::debug!(version, "Version unchanged");
                }
            }

            SyncProgress::ReleaseQuarantined {
                version,
                release_id,
                reason,
            } => {
                tracing::warn!(version, release_id = %release_id, reason = %reason, "Quarantined release");
            }

            SyncProgress::ReconcileComplete { changed } => {
                tracing::info!(changed, "Reconciliation complete");
            }

            SyncProgress::CommitSkipped => {
                tracing::debug!("Snapshot unchanged, nothing to commit");
            }

            SyncProgress::Committed { checksum, releases } => {
                tracing::info!(checksum = %checksum, releases, "Committed snapshot");
            }

            SyncProgress::CommitConflict { expected, found } => {
                tracing::warn!(expected = ?expected, found = ?found, "Concurrent commit detected, reloaded stored snapshot");
            }

            SyncProgress::Warning { message } => {
                tracing::warn!("{}", message);
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}

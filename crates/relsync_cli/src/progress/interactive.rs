use std::sync::{Mutex, MutexGuard, PoisonError};

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use relsync::ReleaseFilterType;
use relsync::sync::SyncProgress;

/// Consolidated progress state to avoid multiple mutex locks.
#[derive(Default)]
struct ProgressState {
    /// One step per major version of the running full sync.
    sync_bar: Option<ProgressBar>,
    /// Versions that failed in the running full sync.
    sync_failures: usize,
    /// One step per major version of the running reconciliation.
    reconcile_bar: Option<ProgressBar>,
}

/// Interactive progress reporter using indicatif.
pub struct InteractiveReporter {
    multi: MultiProgress,
    state: Mutex<ProgressState>,
}

fn filter_label(filter: ReleaseFilterType) -> &'static str {
    match filter {
        ReleaseFilterType::ReleasesOnly => "releases",
        ReleaseFilterType::SnapshotsOnly => "snapshots",
        ReleaseFilterType::All => "all",
    }
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            state: Mutex::new(ProgressState::default()),
        }
    }

    /// Reporter that draws nowhere.
    #[cfg(test)]
    pub fn hidden() -> Self {
        Self {
            multi: MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden()),
            state: Mutex::new(ProgressState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, ProgressState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn new_bar(&self, len: usize, prefix: &str) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new(len as u64));
        pb.set_style(Self::bar_style());
        pb.set_prefix(format!("{:12}", prefix));
        pb
    }

    pub fn handle(&self, event: SyncProgress) {
        let mut state = self.state();

        match event {
            SyncProgress::FullSyncStarted { filter, versions } => {
                if let Some(old) = state.sync_bar.take()
                    && !old.is_finished()
                {
                    old.finish();
                }
                let pb = self.new_bar(versions, "Full sync");
                pb.set_message(format!("fetching {} ...", filter_label(filter)));
                state.sync_bar = Some(pb);
                state.sync_failures = 0;
            }

            SyncProgress::VersionFetched {
                version,
                releases,
                unmapped,
            } => {
                if let Some(ref pb) = state.sync_bar {
                    pb.inc(1);
                    if unmapped > 0 {
                        pb.set_message(format!(
                            "jdk{}: {} releases, {} unmapped",
                            version, releases, unmapped
                        ));
                    } else {
                        pb.set_message(format!("jdk{}: {} releases", version, releases));
                    }
                }
            }

            SyncProgress::VersionFailed { version, error } => {
                state.sync_failures += 1;
                if let Some(ref pb) = state.sync_bar {
                    pb.inc(1);
                    pb.set_message(format!("✗ jdk{}: {}", version, error));
                }
            }

            SyncProgress::CopiedOver { version, count } => {
                if let Some(ref pb) = state.sync_bar {
                    pb.set_message(format!("jdk{}: kept {} releases", version, count));
                }
            }

            SyncProgress::FullSyncComplete { releases } => {
                if let Some(ref pb) = state.sync_bar {
                    let msg = if state.sync_failures > 0 {
                        format!("✓ {} releases, {} versions failed", releases, state.sync_failures)
                    } else {
                        format!("✓ {} releases", releases)
                    };
                    pb.finish_with_message(msg);
                }
            }

            SyncProgress::ReconcileStarted {
                versions,
                pending_refresh,
            } => {
                if let Some(old) = state.reconcile_bar.take()
                    && !old.is_finished()
                {
                    old.finish();
                }
                let pb = self.new_bar(versions, "Reconcile");
                if pending_refresh > 0 {
                    pb.set_message(format!("{} queued refreshes", pending_refresh));
                }
                state.reconcile_bar = Some(pb);
            }

            SyncProgress::VersionReconciled {
                version,
                removed,
                added,
                refreshed,
                quarantined,
            } => {
                if let Some(ref pb) = state.reconcile_bar {
                    pb.inc(1);
                    pb.set_message(format!(
                        "jdk{}: +{} -{} ~{} !{}",
                        version, added, removed, refreshed, quarantined
                    ));
                }
            }

            SyncProgress::ReconcileComplete { changed } => {
                if let Some(ref pb) = state.reconcile_bar {
                    pb.finish_with_message(format!("✓ {} changed", changed));
                }
            }

            SyncProgress::ReleaseQuarantined {
                version,
                release_id,
                reason,
            } => {
                drop(state);
                self.multi
                    .println(format!("⚠ jdk{}: quarantined {}: {}", version, release_id, reason))
                    .ok();
            }

            SyncProgress::CommitSkipped => {}

            SyncProgress::Committed { checksum, releases } => {
                drop(state);
                self.multi
                    .println(format!("✓ committed {} releases ({})", releases, checksum))
                    .ok();
            }

            SyncProgress::CommitConflict { expected, found } => {
                drop(state);
                self.multi
                    .println(format!(
                        "⚠ store changed underneath us (expected {}, found {}), reloaded",
                        expected.as_deref().unwrap_or("none"),
                        found.as_deref().unwrap_or("none")
                    ))
                    .ok();
            }

            SyncProgress::Warning { message } => {
                drop(state);
                self.multi.println(format!("⚠ {}", message)).ok();
            }

            _ => {}
        }
    }

    /// Finish all progress bars.
    pub fn finish(&self) {
        let state = self.state();
        for pb in [&state.sync_bar, &state.reconcile_bar].into_iter().flatten() {
            if !pb.is_finished() {
                pb.finish();
            }
        }
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:30.cyan/blue}] {pos:>2}/{len:2} {msg}")
            .map(|style| style.progress_chars("█▓░"))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}

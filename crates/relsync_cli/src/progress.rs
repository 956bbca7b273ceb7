//! Progress reporting for sync operations.
//!
//! This module provides two modes of progress reporting:
//! - Interactive mode (TTY): progress bars using indicatif
//! - Logging mode (non-TTY): structured logging using tracing
//!
//! A full sync gets one bar with a step per major version, as does a
//! reconciliation pass. Commit results and warnings are printed above the bars.

mod interactive;
mod logging;

use std::sync::Arc;

use console::Term;
use relsync::sync::{ProgressCallback, SyncProgress};

pub use interactive::InteractiveReporter;
pub use logging::LoggingReporter;

/// Progress reporter that handles both interactive and logging modes.
pub enum ProgressReporter {
    /// Interactive progress bars for TTY.
    Interactive(InteractiveReporter),
    /// Structured logging for non-TTY (CI, pipes, services).
    Logging(LoggingReporter),
}

impl ProgressReporter {
    /// Create a new progress reporter, auto-detecting TTY mode.
    pub fn new() -> Self {
        if Term::stdout().is_term() {
            Self::Interactive(InteractiveReporter::new())
        } else {
            Self::Logging(LoggingReporter::new())
        }
    }

    /// Create a logging reporter regardless of the terminal.
    ///
    /// Used by the long-running updater, whose passes repeat for hours.
    pub fn logging() -> Self {
        Self::Logging(LoggingReporter::new())
    }

    /// Handle a progress event.
    pub fn handle(&self, event: SyncProgress) {
        match self {
            Self::Interactive(r) => r.handle(event),
            Self::Logging(r) => r.handle(event),
        }
    }

    /// Convert to a ProgressCallback for the library.
    pub fn as_callback(self: &Arc<Self>) -> ProgressCallback {
        let reporter = Arc::clone(self);
        Box::new(move |event| {
            reporter.handle(event);
        })
    }

    /// Finish all progress bars (interactive mode only).
    pub fn finish(&self) {
        if let Self::Interactive(r) = self {
            r.finish();
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relsync::ReleaseFilterType;

    fn sample_events() -> Vec<SyncProgress> {
        vec![
            SyncProgress::FullSyncStarted {
                filter: ReleaseFilterType::All,
                versions: 2,
            },
            SyncProgress::VersionFetched {
                version: 8,
                releases: 12,
                unmapped: 1,
            },
            SyncProgress::VersionFailed {
                version: 11,
                error: "retry budget exhausted".to_string(),
            },
            SyncProgress::CopiedOver {
                version: 8,
                count: 3,
            },
            SyncProgress::FullSyncComplete { releases: 15 },
            SyncProgress::ReconcileStarted {
                versions: 1,
                pending_refresh: 0,
            },
            SyncProgress::ReleaseQuarantined {
                version: 17,
                release_id: "RE_1".to_string(),
                reason: "no binaries".to_string(),
            },
            SyncProgress::VersionReconciled {
                version: 17,
                removed: 0,
                added: 1,
                refreshed: 2,
                quarantined: 1,
            },
            SyncProgress::ReconcileComplete { changed: 3 },
            SyncProgress::CommitConflict {
                expected: Some("a".to_string()),
                found: None,
            },
            SyncProgress::Committed {
                checksum: "abc".to_string(),
                releases: 15,
            },
            SyncProgress::CommitSkipped,
            SyncProgress::Warning {
                message: "careful".to_string(),
            },
        ]
    }

    #[test]
    fn logging_reporter_handles_every_event() {
        let reporter = Arc::new(ProgressReporter::logging());
        let callback = reporter.as_callback();
        for event in sample_events() {
            callback(event);
        }
        reporter.finish();
    }

    #[test]
    fn interactive_reporter_handles_every_event() {
        let reporter = ProgressReporter::Interactive(InteractiveReporter::hidden());
        for event in sample_events() {
            reporter.handle(event);
        }
        reporter.finish();
    }
}

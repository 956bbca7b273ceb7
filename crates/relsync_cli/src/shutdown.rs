use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use console::Term;
use tokio::sync::Notify;

/// Global shutdown flag for graceful termination.
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

static SHUTDOWN_NOTIFY: OnceLock<Notify> = OnceLock::new();

fn shutdown_notify() -> &'static Notify {
    SHUTDOWN_NOTIFY.get_or_init(Notify::new)
}

/// Check if shutdown has been requested.
#[inline]
pub(crate) fn is_shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::Acquire)
}

fn request_shutdown() {
    SHUTDOWN_REQUESTED.store(true, Ordering::Release);
    shutdown_notify().notify_waiters();
}

/// Resolves once shutdown has been requested.
pub(crate) async fn shutdown_requested() {
    let notified = shutdown_notify().notified();
    tokio::pin!(notified);
    // Register before checking the flag so a request in between is not missed.
    notified.as_mut().enable();
    if is_shutdown_requested() {
        return;
    }
    notified.await;
}

/// Set up the Ctrl+C handler for graceful shutdown.
///
/// The first Ctrl+C asks running jobs to stop; a second one exits with 130.
pub(crate) fn setup_shutdown_handler() {
    tokio::spawn(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            return;
        }

        let is_tty = Term::stdout().is_term();
        if is_tty {
            eprintln!("\n\nShutdown requested, finishing current operations...");
            eprintln!("Press Ctrl+C again to force quit.");
        } else {
            tracing::warn!("Shutdown requested, finishing current operations");
        }

        request_shutdown();

        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install second Ctrl+C handler");
            return;
        }

        if is_tty {
            eprintln!("Force quit!");
        }
        std::process::exit(130);
    });
}

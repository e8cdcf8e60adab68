//! Lifecycle helpers: termination signals, bounded drain and bounded disconnect.

use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::client::KvClient;

/// How long shutdown waits for the backend to release its connection.
pub const DISCONNECT_DEADLINE: Duration = Duration::from_secs(5);

/// How long in-flight requests may keep running once shutdown starts.
pub const DRAIN_DEADLINE: Duration = Duration::from_secs(5);

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}

/// One-shot shutdown notice shared by the server and its drain timer.
#[derive(Clone, Debug)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Resolves once [`trigger`](Self::trigger) has been called, even if
    /// that happened before this was awaited.
    pub async fn triggered(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|fired| *fired).await;
    }
}

/// Runs `server` until it finishes, or until `drain` has elapsed after
/// `shutdown` fired. Returns `Ok(false)` when connections were still open at
/// the deadline and the server was abandoned.
pub async fn serve_with_drain_deadline<S, E>(
    server: S,
    shutdown: &Shutdown,
    drain: Duration,
) -> Result<bool, E>
where
    S: IntoFuture<Output = Result<(), E>>,
{
    let deadline = async {
        shutdown.triggered().await;
        tokio::time::sleep(drain).await;
    };

    tokio::select! {
        result = server.into_future() => result.map(|()| true),
        _ = deadline => {
            warn!(?drain, "Requests still in flight after drain deadline, closing anyway");
            Ok(false)
        }
    }
}

/// Disconnects the client, giving up after `deadline`.
///
/// Returns false when the deadline elapsed first.
pub async fn disconnect_with_deadline(client: &KvClient, deadline: Duration) -> bool {
    match tokio::time::timeout(deadline, client.disconnect()).await {
        Ok(()) => true,
        Err(_) => {
            warn!(?deadline, "Backend disconnect did not finish in time, exiting anyway");
            false
        }
    }
}

/// Future that resolves when `shutdown` fires; suitable for
/// `with_graceful_shutdown`.
pub fn on_shutdown(shutdown: &Shutdown) -> impl Future<Output = ()> + Send + 'static {
    let shutdown = shutdown.clone();
    async move { shutdown.triggered().await }
}

//! Shutdown (SIGINT/SIGTERM) and reload (SIGHUP) signal dispatch.

use tokio::sync::watch;

/// Listens for OS signals. Shutdown is broadcast through a watch channel so
/// the server and any background task can await it.
pub struct SignalHandler {
    shutdown_tx: watch::Sender<bool>,
}

impl SignalHandler {
    /// Returns the handler and a receiver that flips to `true` on shutdown.
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { shutdown_tx: tx }, rx)
    }

    /// Run until a shutdown signal arrives, calling `on_reload` for every
    /// SIGHUP in between. If a handler cannot be installed, shutdown is
    /// triggered immediately rather than running unstoppable.
    pub async fn run<F>(self, on_reload: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            match (signal(SignalKind::terminate()), signal(SignalKind::hangup())) {
                (Ok(mut sigterm), Ok(mut sighup)) => loop {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {
                            tracing::info!("Received SIGINT, shutting down...");
                            break;
                        }
                        _ = sigterm.recv() => {
                            tracing::info!("Received SIGTERM, shutting down...");
                            break;
                        }
                        _ = sighup.recv() => {
                            tracing::info!("Received SIGHUP, reloading configuration...");
                            on_reload();
                        }
                    }
                },
                (Err(e), _) | (_, Err(e)) => {
                    tracing::error!("Failed to install signal handlers: {e}");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = &on_reload;
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to install Ctrl+C handler: {e}");
            }
            tracing::info!("Received Ctrl+C, shutting down...");
        }

        self.trigger();
    }

    fn trigger(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

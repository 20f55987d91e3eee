//! Shutdown coordination between the binary and the scheduler.

use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::sync::watch;
use tracing::info;

/// Transmitter side of the shutdown channel.
#[derive(Debug, Clone)]
pub struct ShutdownTx(watch::Sender<bool>);

impl ShutdownTx {
    /// Requests every subscribed job loop to stop after its in-flight run.
    pub fn shutdown(&self) {
        // Infallible, so shutdown can be requested before anyone subscribes.
        self.0.send_replace(true);
    }

    pub fn subscribe(&self) -> ShutdownRx {
        self.0.subscribe()
    }
}

/// Receiver side of the shutdown channel. `true` once shutdown was requested.
pub type ShutdownRx = watch::Receiver<bool>;

/// Creates a new shutdown channel in the running state.
pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTx(tx), rx)
}

/// Waits until `rx` reports shutdown or its sender is gone.
pub async fn wait_for_shutdown(rx: &mut ShutdownRx) {
    // An error means the sender was dropped, which we treat as shutdown.
    let _ = rx.wait_for(|stop| *stop).await;
}

/// Installed SIGTERM and SIGINT handlers.
pub struct SignalListener {
    sigterm: Signal,
    sigint: Signal,
}

impl SignalListener {
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {
            sigterm: signal(SignalKind::terminate())?,
            sigint: signal(SignalKind::interrupt())?,
        })
    }

    /// Triggers `tx` on the first SIGTERM or SIGINT.
    pub async fn forward_to(mut self, tx: ShutdownTx) {
        tokio::select! {
            _ = self.sigterm.recv() => info!("received SIGTERM, shutting down gracefully"),
            _ = self.sigint.recv() => info!("received SIGINT, shutting down gracefully"),
        }

        tx.shutdown();
    }
}

//! Broadcast shutdown signaling for racer tasks.
//!
//! A single shutdown signal cancels all subscribed racers simultaneously. The
//! signal carries no payload; subscribers only care that it fired. Racers poll
//! it inside `tokio::select!` alongside their current stage, so cancellation
//! takes effect mid-stage rather than waiting for a stage boundary.

use tokio::sync::watch;

/// Transmitter side of the shutdown channel.
#[derive(Debug, Clone)]
pub struct ShutdownTx(watch::Sender<()>);

impl ShutdownTx {
    /// Signals shutdown to all subscribed receivers.
    ///
    /// Returns an error when no receivers are subscribed, which callers may
    /// safely ignore: it means no racer work is outstanding.
    pub fn shutdown(&self) -> Result<(), watch::error::SendError<()>> {
        self.0.send(())
    }

    /// Creates a new receiver subscribed to this shutdown channel.
    pub fn subscribe(&self) -> ShutdownRx {
        ShutdownRx(self.0.subscribe())
    }
}

/// Receiver side of the shutdown channel.
#[derive(Debug, Clone)]
pub struct ShutdownRx(watch::Receiver<()>);

impl ShutdownRx {
    /// Resolves once shutdown has been signaled.
    ///
    /// A dropped transmitter is treated as a shutdown signal, so a racer never
    /// outlives the race that spawned it.
    pub async fn signaled(&mut self) {
        let _ = self.0.changed().await;
    }
}

/// Creates a new shutdown channel.
///
/// The receiver side is obtained through [`ShutdownTx::subscribe`], one per
/// racer, so each racer observes the signal independently.
pub fn create_shutdown_channel() -> ShutdownTx {
    let (tx, _) = watch::channel(());
    ShutdownTx(tx)
}

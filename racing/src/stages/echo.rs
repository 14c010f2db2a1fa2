//! Ordered echo round-trip leg.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::bail;
use crate::environment::RaceEnvironment;
use crate::error::{ErrorKind, RaceResult};
use crate::stages::RaceStage;

/// An echo round-trip leg.
///
/// Spawns an echo task wired up with a channel pair and sends it a sequence of
/// messages, verifying each one comes back unmodified and in order before the
/// next is sent.
#[derive(Debug, Clone)]
pub struct EchoStage {
    /// Number of messages to echo.
    pub messages: u32,
    /// Bound applied to each round-trip.
    pub round_trip_timeout: Duration,
}

impl Default for EchoStage {
    fn default() -> Self {
        Self {
            messages: 5,
            round_trip_timeout: Duration::from_secs(5),
        }
    }
}

#[async_trait]
impl RaceStage for EchoStage {
    fn name(&self) -> &'static str {
        "echo"
    }

    async fn run(&mut self, _environment: &RaceEnvironment) -> RaceResult<()> {
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(1);
        let (inbound_tx, mut inbound_rx) = mpsc::channel::<String>(1);

        let echo = tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                if inbound_tx.send(message).await.is_err() {
                    break;
                }
            }
        });

        for sequence in 0..self.messages {
            let message = format!("echo {sequence}");

            if outbound_tx.send(message.clone()).await.is_err() {
                bail!(ErrorKind::MessagingError, "echo task went away");
            }

            let echoed = match timeout(self.round_trip_timeout, inbound_rx.recv()).await {
                Ok(Some(echoed)) => echoed,
                Ok(None) => bail!(ErrorKind::MessagingError, "echo task closed its channel"),
                Err(_) => bail!(
                    ErrorKind::MessagingError,
                    "echo round-trip did not complete in time",
                    format!("message {sequence}, waited {:?}", self.round_trip_timeout)
                ),
            };

            if echoed != message {
                bail!(
                    ErrorKind::StageFailed,
                    "echoed message does not match what was sent",
                    format!("sent '{message}', received '{echoed}'")
                );
            }
        }

        drop(outbound_tx);
        let _ = echo.await;

        Ok(())
    }
}

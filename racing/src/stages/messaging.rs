//! Request/reply messaging leg.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

use crate::bail;
use crate::environment::{RaceEnvironment, properties};
use crate::error::{ErrorKind, RaceResult};
use crate::stages::RaceStage;

/// One in-flight request together with its reply channel.
struct Exchange {
    payload: String,
    reply: oneshot::Sender<String>,
}

/// A messaging round-trip leg.
///
/// Spawns a responder task and exchanges a fixed number of request/reply
/// pairs with it over channels, each bounded by a reply timeout. The leg
/// verifies that every reply carries the request payload back unchanged.
#[derive(Debug, Clone)]
pub struct MessagingStage {
    /// Number of request/reply exchanges to perform.
    pub exchanges: u32,
    /// Bound applied to each individual reply.
    pub reply_timeout: Duration,
}

impl Default for MessagingStage {
    fn default() -> Self {
        Self {
            exchanges: 3,
            reply_timeout: Duration::from_secs(5),
        }
    }
}

#[async_trait]
impl RaceStage for MessagingStage {
    fn name(&self) -> &'static str {
        "messaging"
    }

    async fn run(&mut self, environment: &RaceEnvironment) -> RaceResult<()> {
        let (request_tx, mut request_rx) = mpsc::channel::<Exchange>(1);

        let responder = tokio::spawn(async move {
            while let Some(exchange) = request_rx.recv().await {
                // A dropped reply receiver means the requester gave up.
                let _ = exchange.reply.send(exchange.payload);
            }
        });

        let server = environment
            .get(properties::SERVER_NAME)
            .unwrap_or("localhost");

        for sequence in 0..self.exchanges {
            let payload = format!("ping {sequence} via {server}");
            let (reply_tx, reply_rx) = oneshot::channel();

            let exchange = Exchange {
                payload: payload.clone(),
                reply: reply_tx,
            };
            if request_tx.send(exchange).await.is_err() {
                bail!(
                    ErrorKind::MessagingError,
                    "responder stopped accepting requests"
                );
            }

            let reply = match timeout(self.reply_timeout, reply_rx).await {
                Ok(Ok(reply)) => reply,
                Ok(Err(_)) => bail!(
                    ErrorKind::MessagingError,
                    "responder dropped the reply channel"
                ),
                Err(_) => bail!(
                    ErrorKind::MessagingError,
                    "reply did not arrive in time",
                    format!("exchange {sequence}, waited {:?}", self.reply_timeout)
                ),
            };

            if reply != payload {
                bail!(
                    ErrorKind::StageFailed,
                    "reply does not match the request payload",
                    format!("sent '{payload}', received '{reply}'")
                );
            }
        }

        drop(request_tx);
        let _ = responder.await;

        Ok(())
    }
}

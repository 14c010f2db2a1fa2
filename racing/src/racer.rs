//! Racer tasks and the protocol they follow.

use tracing::debug;

use crate::concurrency::shutdown::ShutdownRx;
use crate::error::ErrorKind;
use crate::race::Registration;
use crate::race_error;
use crate::stages::{BoxedStage, RaceStage};
use crate::stages::echo::EchoStage;
use crate::stages::encoding::EncodingStage;
use crate::stages::messaging::MessagingStage;

/// A unit of work participating in a race.
///
/// A racer owns an ordered list of stages. Once spawned it signals readiness,
/// runs its stages in order, and reports exactly one of finish or abort back
/// through its [`Registration`]. Stage failures are recovered as aborts and
/// never surfaced to the initiator.
pub struct Racer {
    name: String,
    stages: Vec<BoxedStage>,
}

impl Racer {
    /// Creates a racer with no stages.
    ///
    /// A stage-less racer finishes immediately after the start barrier
    /// releases, which is useful in tests exercising only the coordination
    /// protocol.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    /// Creates a racer running the three standard stages: messaging, echo,
    /// and encoding.
    pub fn standard(name: impl Into<String>) -> Self {
        Self::new(name)
            .with_stage(MessagingStage::default())
            .with_stage(EchoStage::default())
            .with_stage(EncodingStage::default())
    }

    /// Appends a stage to this racer's course.
    pub fn with_stage(mut self, stage: impl RaceStage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Returns the racer's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the full race protocol for this racer.
    ///
    /// Signals ready, then races each stage against the shutdown signal, then
    /// reports the terminal outcome. A ready timeout aborts without running
    /// any stage; a shutdown observed mid-stage aborts with
    /// [`ErrorKind::ShutdownRequested`].
    pub async fn run(mut self, registration: Registration, mut shutdown: ShutdownRx) {
        let ready = tokio::select! {
            result = registration.ready() => Some(result),
            _ = shutdown.signaled() => None,
        };

        match ready {
            Some(Ok(())) => {}
            Some(Err(err)) => {
                registration.abort(err);
                return;
            }
            None => {
                registration.abort(race_error!(
                    ErrorKind::ShutdownRequested,
                    "race was shut down before the start barrier released"
                ));
                return;
            }
        }

        let environment = registration.environment().clone();

        for stage in self.stages.iter_mut() {
            let stage_result = tokio::select! {
                result = stage.run(&environment) => Some(result),
                _ = shutdown.signaled() => None,
            };

            match stage_result {
                Some(Ok(())) => {
                    debug!(
                        racer = %registration.descriptor(),
                        stage = stage.name(),
                        "racer completed stage"
                    );
                }
                Some(Err(err)) => {
                    registration.abort(err);
                    return;
                }
                None => {
                    registration.abort(race_error!(
                        ErrorKind::ShutdownRequested,
                        "race was shut down mid-stage",
                        stage.name()
                    ));
                    return;
                }
            }
        }

        registration.finish();
    }
}

/// The four racing legends of the original deployment, each running the
/// standard stages.
pub fn legends() -> Vec<Racer> {
    [
        "Jimmie Thronson",
        "Michael Thrumacher",
        "Sebastien Throeb",
        "Valentino Throssi",
    ]
    .into_iter()
    .map(Racer::standard)
    .collect()
}

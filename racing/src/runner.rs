//! Spawns racers onto a task pool and drives the initiator protocol.

use tokio::task::JoinSet;
use tracing::{error, info};

use crate::bail;
use crate::concurrency::shutdown::{ShutdownTx, create_shutdown_channel};
use crate::config::RaceConfig;
use crate::environment::RaceEnvironment;
use crate::error::{ErrorKind, RaceError, RaceResult};
use crate::race::Race;
use crate::race_error;
use crate::racer::Racer;
use crate::types::{RaceId, RaceOutcome};

/// Runs races end to end.
///
/// [`RaceRunner`] replaces thread-per-racer dispatch with an explicit task
/// pool: each racer becomes a task on a [`JoinSet`], holding a subscription to
/// a shared shutdown channel. When a race is abandoned (start timeout) or ends
/// incomplete, the runner fires the shutdown signal so outstanding racer work
/// stops instead of lingering.
#[derive(Debug)]
pub struct RaceRunner {
    config: RaceConfig,
    environment: RaceEnvironment,
    shutdown_tx: ShutdownTx,
}

impl RaceRunner {
    /// Creates a runner for the given configuration and shared environment.
    ///
    /// Fails with [`ErrorKind::ConfigError`] when the configuration does not
    /// validate.
    pub fn new(config: RaceConfig, environment: RaceEnvironment) -> RaceResult<Self> {
        if let Err(err) = config.validate() {
            bail!(
                ErrorKind::ConfigError,
                "invalid race configuration",
                err.to_string(),
                source: err
            );
        }

        Ok(Self {
            config,
            environment,
            shutdown_tx: create_shutdown_channel(),
        })
    }

    /// Returns a handle to the runner's shutdown channel.
    ///
    /// Callers may use it to cancel an in-flight race from the outside.
    pub fn shutdown_tx(&self) -> ShutdownTx {
        self.shutdown_tx.clone()
    }

    /// Runs one race with the given racers and returns its outcome.
    ///
    /// Registers and spawns every racer, joins the start barrier as the
    /// initiator, and then waits for results. The one `Err` path is a start
    /// timeout; an incomplete race is an `Ok` outcome the caller branches on.
    pub async fn run(&self, id: RaceId, racers: Vec<Racer>) -> RaceResult<RaceOutcome> {
        let race = Race::new(
            id,
            racers.len() as u32,
            self.environment.clone(),
            self.config.clone(),
        )?;

        let mut tasks = JoinSet::new();
        for racer in racers {
            let registration = race.register(racer.name());
            let shutdown_rx = self.shutdown_tx.subscribe();
            tasks.spawn(racer.run(registration, shutdown_rx));
        }

        info!(
            race_id = id,
            racers = race.racer_count(),
            "racers spawned, initiator joining the start barrier"
        );

        if let Err(err) = race.start().await {
            // The race failed to start; cancel racers still waiting or running.
            let _ = self.shutdown_tx.shutdown();
            drain(&mut tasks).await;

            return Err(err);
        }

        let outcome = race.results().await;
        if !outcome.is_complete() {
            let _ = self.shutdown_tx.shutdown();
        }

        drain(&mut tasks).await;

        Ok(outcome)
    }
}

/// Waits for all racer tasks to settle, logging any panics.
///
/// A panicked racer never reports a terminal operation, so its absence already
/// degrades the outcome; the panic itself is logged and never tears down the
/// runner.
async fn drain(tasks: &mut JoinSet<()>) {
    let mut panics = Vec::new();

    while let Some(result) = tasks.join_next().await {
        if let Err(err) = result {
            if err.is_panic() {
                panics.push(race_error!(
                    ErrorKind::RacerPanic,
                    "racer task panicked",
                    err.to_string()
                ));
            }
        }
    }

    if !panics.is_empty() {
        error!(
            error = %RaceError::from(panics),
            "racer tasks panicked during the race"
        );
    }
}

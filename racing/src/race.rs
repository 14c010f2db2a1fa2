//! The race coordinator core.
//!
//! A [`Race`] synchronizes a fixed number of racers plus one initiator through
//! a start barrier, then collects finish positions through a completion latch.
//! Racers interact with the race exclusively through the [`Registration`]
//! capability handed out by [`Race::register`]; the initiator drives the race
//! through [`Race::start`] and [`Race::results`].
//!
//! Position assignment is linearizable: the atomic increment of the position
//! counter and the append of the finish record happen while no other racer can
//! observe the same position value, so standings are always a permutation of
//! `1..=finishers`.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{Barrier, watch};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::bail;
use crate::concurrency::latch::CountdownLatch;
use crate::config::RaceConfig;
use crate::environment::RaceEnvironment;
use crate::error::{ErrorKind, RaceError, RaceResult};
use crate::types::{
    FinishRecord, Position, RaceId, RaceOutcome, RacePhase, RaceStandings, RacerDescriptor,
};

/// State shared between the race and all of its registrations.
#[derive(Debug)]
struct RaceShared {
    race_id: RaceId,
    /// Rendezvous for `racer_count + 1` parties: all racers plus the initiator.
    start: Barrier,
    /// Counts down once per racer, on finish or abort.
    finished: CountdownLatch,
    /// Next finish position; incremented atomically on each finish.
    position: AtomicU32,
    /// Append-only finish records; never updated after insertion.
    results: Mutex<Vec<FinishRecord>>,
    /// Every racer registered for this race, used for "did not finish" reporting.
    registered: Mutex<Vec<RacerDescriptor>>,
    environment: RaceEnvironment,
    phase: watch::Sender<RacePhase>,
    start_timeout: Duration,
    /// Set when any party times out at the start barrier.
    ///
    /// The barrier's arrival count survives a timed-out waiter, so without
    /// this flag a party arriving after the timeout could be released by the
    /// stale arrivals and race alone. Once set, every waiting and future
    /// party fails its start wait instead.
    abandoned: watch::Sender<bool>,
}

impl RaceShared {
    /// Advances the phase, never moving it backwards.
    ///
    /// Phase updates race each other (e.g. several parties leave the barrier
    /// at once), so only strictly forward transitions are applied.
    fn advance_phase(&self, next: RacePhase) {
        self.phase.send_if_modified(|phase| {
            if *phase < next {
                *phase = next;
                true
            } else {
                false
            }
        });
    }

    /// Joins the start barrier, bounded by the start timeout.
    ///
    /// The first party to time out marks the race abandoned; parties still
    /// waiting observe the flag and fail symmetrically, and parties arriving
    /// afterwards fail before joining the barrier at all.
    async fn await_start(&self, party: &str) -> RaceResult<()> {
        let mut abandoned = self.abandoned.subscribe();
        if *abandoned.borrow() {
            bail!(
                ErrorKind::StartTimeout,
                "the race was abandoned before this party arrived",
                format!("party '{party}'")
            );
        }

        let wait = async {
            tokio::select! {
                result = self.start.wait() => Some(result),
                _ = abandoned.wait_for(|abandoned| *abandoned) => None,
            }
        };

        match timeout(self.start_timeout, wait).await {
            Ok(Some(result)) => {
                self.advance_phase(RacePhase::Running);
                if result.is_leader() {
                    info!(race_id = self.race_id, "start barrier released, race is on");
                }
                Ok(())
            }
            Ok(None) => {
                warn!(
                    race_id = self.race_id,
                    party, "race was abandoned while this party waited at the start barrier"
                );
                bail!(
                    ErrorKind::StartTimeout,
                    "another party timed out at the start barrier",
                    format!("party '{party}'")
                )
            }
            Err(_) => {
                self.abandoned.send_replace(true);
                warn!(
                    race_id = self.race_id,
                    party, "party timed out at the start barrier, abandoning the race"
                );
                bail!(
                    ErrorKind::StartTimeout,
                    "not all parties reached the start barrier in time",
                    format!("party '{party}' waited {:?}", self.start_timeout)
                )
            }
        }
    }

    /// Snapshots the current standings.
    fn standings(&self) -> RaceStandings {
        let results = self
            .results
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        RaceStandings::from_records(results.clone())
    }
}

/// A multi-party race between a fixed number of racers.
///
/// Created fresh for each race; never reused. The race is mutated only through
/// the terminal operations on its registrations and the two synchronization
/// operations ([`Race::start`] and each registration's ready call).
#[derive(Debug)]
pub struct Race {
    racer_count: u32,
    results_timeout: Duration,
    shared: Arc<RaceShared>,
}

impl Race {
    /// Creates a new race for `racer_count` participants.
    ///
    /// Fails with [`ErrorKind::InvalidRacerCount`] when `racer_count` is zero.
    /// The start barrier expects `racer_count + 1` parties: every racer plus
    /// the initiator calling [`Race::start`].
    pub fn new(
        id: RaceId,
        racer_count: u32,
        environment: RaceEnvironment,
        config: RaceConfig,
    ) -> RaceResult<Self> {
        if racer_count == 0 {
            bail!(
                ErrorKind::InvalidRacerCount,
                "a race needs at least one racer",
                format!("racer_count = {racer_count}")
            );
        }

        let (phase, _) = watch::channel(RacePhase::Registering);
        let (abandoned, _) = watch::channel(false);

        let shared = Arc::new(RaceShared {
            race_id: id,
            start: Barrier::new(racer_count as usize + 1),
            finished: CountdownLatch::new(racer_count),
            position: AtomicU32::new(0),
            results: Mutex::new(Vec::with_capacity(racer_count as usize)),
            registered: Mutex::new(Vec::with_capacity(racer_count as usize)),
            environment,
            phase,
            start_timeout: config.start_timeout(),
            abandoned,
        });

        Ok(Self {
            racer_count,
            results_timeout: config.results_timeout(),
            shared,
        })
    }

    /// Returns the race id.
    pub fn id(&self) -> RaceId {
        self.shared.race_id
    }

    /// Returns the fixed number of participants.
    pub fn racer_count(&self) -> u32 {
        self.racer_count
    }

    /// Returns the current lifecycle phase.
    pub fn phase(&self) -> RacePhase {
        *self.shared.phase.borrow()
    }

    /// Returns a watch receiver observing lifecycle phase transitions.
    pub fn phase_watch(&self) -> watch::Receiver<RacePhase> {
        self.shared.phase.subscribe()
    }

    /// Registers a racer and returns its capability handle.
    ///
    /// Must be called exactly once per racer before [`Race::start`]; the race
    /// does not enforce idempotence, callers guard against double
    /// registration.
    pub fn register(&self, name: impl Into<String>) -> Registration {
        let racer = RacerDescriptor::new(name);
        debug!(race_id = self.shared.race_id, racer = %racer, "racer registered");

        self.shared
            .registered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(racer.clone());

        Registration {
            racer,
            shared: Arc::clone(&self.shared),
        }
    }

    /// Joins the start barrier as the initiator.
    ///
    /// Blocks until all registered racers have signaled ready, or fails with
    /// [`ErrorKind::StartTimeout`] once the start bound elapses. Partial
    /// readiness is not recoverable; a timed-out race is abandoned.
    pub async fn start(&self) -> RaceResult<()> {
        self.shared.advance_phase(RacePhase::AwaitingStart);
        info!(
            race_id = self.shared.race_id,
            racers = self.racer_count,
            "initiator waiting at the start barrier"
        );

        self.shared.await_start("initiator").await
    }

    /// Waits for all racers to finish or abort, then returns the outcome.
    ///
    /// Bounded by the results timeout: on elapse the outcome is
    /// [`RaceOutcome::Incomplete`], carrying the partial standings together
    /// with the names of racers that did not finish. Either way the race
    /// transitions to [`RacePhase::Complete`].
    pub async fn results(&self) -> RaceOutcome {
        let complete = timeout(self.results_timeout, self.shared.finished.wait())
            .await
            .is_ok();

        self.shared.advance_phase(RacePhase::Complete);
        let standings = self.shared.standings();

        if complete {
            info!(
                race_id = self.shared.race_id,
                finishers = standings.len(),
                "race complete"
            );
            return RaceOutcome::Complete(standings);
        }

        let did_not_finish = {
            let registered = self
                .shared
                .registered
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            registered
                .iter()
                .filter(|racer| standings.position_of(racer.name()).is_none())
                .map(|racer| racer.name().to_owned())
                .collect::<Vec<_>>()
        };

        warn!(
            race_id = self.shared.race_id,
            outstanding = self.shared.finished.remaining(),
            "race did not complete within the results bound"
        );

        RaceOutcome::Incomplete {
            standings,
            did_not_finish,
        }
    }
}

/// The capability through which one racer interacts with its race.
///
/// Terminal operations consume the handle, so each racer reports exactly one
/// of finish or abort, exactly once.
#[derive(Debug)]
pub struct Registration {
    racer: RacerDescriptor,
    shared: Arc<RaceShared>,
}

impl Registration {
    /// Returns the identity this handle is bound to.
    pub fn descriptor(&self) -> &RacerDescriptor {
        &self.racer
    }

    /// Returns the race's shared read-only environment.
    pub fn environment(&self) -> &RaceEnvironment {
        &self.shared.environment
    }

    /// Announces this racer is ready and waits for the start barrier.
    ///
    /// Releases concurrently with the initiator's [`Race::start`] call once
    /// all parties have arrived; fails with [`ErrorKind::StartTimeout`]
    /// symmetrically when the bound elapses.
    pub async fn ready(&self) -> RaceResult<()> {
        debug!(
            race_id = self.shared.race_id,
            racer = %self.racer,
            "racer ready, waiting at the start barrier"
        );

        self.shared.await_start(self.racer.name()).await
    }

    /// Records that this racer finished the race.
    ///
    /// Assigns the next sequential position, appends the finish record, and
    /// counts the completion latch down. Safe to call concurrently with other
    /// racers' terminal operations.
    pub fn finish(self) -> Position {
        let position = self.shared.position.fetch_add(1, Ordering::SeqCst) + 1;

        {
            let mut results = self
                .shared
                .results
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            results.push(FinishRecord {
                racer: self.racer.clone(),
                position,
            });
        }

        info!(
            race_id = self.shared.race_id,
            racer = %self.racer,
            position,
            "racer finished the race"
        );

        self.shared.finished.count_down();
        position
    }

    /// Records that this racer aborted the race.
    ///
    /// Counts the completion latch down without assigning a position; the
    /// racer will be absent from the standings.
    pub fn abort(self, cause: RaceError) {
        warn!(
            race_id = self.shared.race_id,
            racer = %self.racer,
            error = %cause,
            "racer aborted the race"
        );

        self.shared.finished.count_down();
    }
}

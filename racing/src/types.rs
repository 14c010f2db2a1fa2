//! Common types used throughout the race coordination system.

use std::fmt;

use uuid::Uuid;

/// Identifier of a single race, chosen by the caller.
pub type RaceId = u64;

/// Finish position assigned to a racer, in `1..=racer_count`.
pub type Position = u32;

/// Unique identity of a racer within a race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RacerId(Uuid);

impl RacerId {
    /// Generates a fresh random racer id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RacerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RacerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one registered racer: a generated id plus a caller-chosen name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RacerDescriptor {
    id: RacerId,
    name: String,
}

impl RacerDescriptor {
    /// Creates a descriptor with a fresh id for the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: RacerId::new(),
            name: name.into(),
        }
    }

    /// Returns the racer's generated id.
    pub fn id(&self) -> RacerId {
        self.id
    }

    /// Returns the racer's name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RacerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// A single ranked entry in the race standings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishRecord {
    /// The racer that finished.
    pub racer: RacerDescriptor,
    /// The position it finished in.
    pub position: Position,
}

/// Position-ordered standings of a race.
///
/// Contains one record per racer that called finish, sorted by position.
/// Racers that aborted or never reported are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RaceStandings {
    records: Vec<FinishRecord>,
}

impl RaceStandings {
    /// Builds standings from unordered finish records.
    pub(crate) fn from_records(mut records: Vec<FinishRecord>) -> Self {
        records.sort_by_key(|record| record.position);
        Self { records }
    }

    /// Returns the ranked records, best position first.
    pub fn records(&self) -> &[FinishRecord] {
        &self.records
    }

    /// Returns the assigned positions in ranking order.
    pub fn positions(&self) -> Vec<Position> {
        self.records.iter().map(|record| record.position).collect()
    }

    /// Looks up the position of a racer by name.
    pub fn position_of(&self, name: &str) -> Option<Position> {
        self.records
            .iter()
            .find(|record| record.racer.name() == name)
            .map(|record| record.position)
    }

    /// Returns the number of racers that finished.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` when no racer finished.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Typed result of waiting for race results.
///
/// Callers branch on the variant rather than catching a timeout error: an
/// incomplete race still carries whatever standings were gathered, together
/// with the names of registered racers that did not finish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RaceOutcome {
    /// Every registered racer finished or aborted within the results bound.
    Complete(RaceStandings),
    /// The results bound elapsed with racers still outstanding.
    Incomplete {
        /// The partial standings gathered before the timeout.
        standings: RaceStandings,
        /// Names of registered racers absent from the standings.
        did_not_finish: Vec<String>,
    },
}

impl RaceOutcome {
    /// Returns `true` for a [`RaceOutcome::Complete`] outcome.
    pub fn is_complete(&self) -> bool {
        matches!(self, RaceOutcome::Complete(_))
    }

    /// Returns the standings regardless of completeness.
    pub fn standings(&self) -> &RaceStandings {
        match self {
            RaceOutcome::Complete(standings) => standings,
            RaceOutcome::Incomplete { standings, .. } => standings,
        }
    }
}

/// Lifecycle phase of a race.
///
/// Phases only ever advance: `Registering -> AwaitingStart -> Running -> Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RacePhase {
    /// Accepting racer registrations.
    Registering,
    /// The initiator has joined the start barrier.
    AwaitingStart,
    /// The start barrier released; racers are running their stages.
    Running,
    /// All racers reported, or the results wait timed out.
    Complete,
}

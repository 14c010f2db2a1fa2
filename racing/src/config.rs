//! Configuration for race coordination.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

const fn default_start_timeout_secs() -> u64 {
    5
}

const fn default_results_timeout_secs() -> u64 {
    60
}

/// Configuration for a race.
///
/// Contains the bounds applied to the two blocking waits of the coordination
/// protocol: the start barrier rendezvous and the wait for all racers to
/// finish or abort.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct RaceConfig {
    /// Maximum number of seconds each party waits at the start barrier before
    /// the race is considered failed to start.
    #[serde(default = "default_start_timeout_secs")]
    pub start_timeout_secs: u64,
    /// Maximum number of seconds the initiator waits for all racers to finish
    /// or abort before receiving partial results.
    #[serde(default = "default_results_timeout_secs")]
    pub results_timeout_secs: u64,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            start_timeout_secs: default_start_timeout_secs(),
            results_timeout_secs: default_results_timeout_secs(),
        }
    }
}

impl RaceConfig {
    /// Validates the configuration.
    ///
    /// Ensures both timeout bounds are non-zero; a zero bound would make every
    /// blocking wait fail immediately.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.start_timeout_secs == 0 {
            return Err(ValidationError::StartTimeoutZero);
        }

        if self.results_timeout_secs == 0 {
            return Err(ValidationError::ResultsTimeoutZero);
        }

        Ok(())
    }

    /// Returns the start barrier timeout as a [`Duration`].
    pub fn start_timeout(&self) -> Duration {
        Duration::from_secs(self.start_timeout_secs)
    }

    /// Returns the results wait timeout as a [`Duration`].
    pub fn results_timeout(&self) -> Duration {
        Duration::from_secs(self.results_timeout_secs)
    }
}

/// Errors returned by [`RaceConfig::validate`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("start timeout must be greater than zero")]
    StartTimeoutZero,
    #[error("results timeout must be greater than zero")]
    ResultsTimeoutZero,
}

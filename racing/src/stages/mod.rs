//! Race stages: the work a racer performs between start and finish.
//!
//! Stages run strictly in order within one racer and with no cross-racer
//! synchronization; racers only meet again at the finish latch. The stages
//! shipped here are in-process round-trips modeled on the original course
//! (a messaging leg, an echo leg, and an encoding leg); callers compose their
//! own courses by implementing [`RaceStage`].

use async_trait::async_trait;

use crate::environment::RaceEnvironment;
use crate::error::RaceResult;

pub mod echo;
pub mod encoding;
pub mod messaging;

/// One leg of a racer's course.
#[async_trait]
pub trait RaceStage: Send {
    /// Short stable name used in logs.
    fn name(&self) -> &'static str;

    /// Runs the stage to completion.
    ///
    /// An error aborts the whole racer; the remaining stages are skipped and
    /// the racer is reported as aborted.
    async fn run(&mut self, environment: &RaceEnvironment) -> RaceResult<()>;
}

/// A heap-allocated, dynamically dispatched stage.
pub type BoxedStage = Box<dyn RaceStage>;

//! Coordination of multi-party races between asynchronous tasks.
//!
//! A race synchronizes N independent racer tasks through a start barrier and a
//! completion latch: every racer (plus the race initiator) rendezvouses at the
//! barrier, runs its stages, and then records a finish position or an abort.
//! The initiator collects an ordered set of standings once all racers have
//! reported, or a partial set if the race does not complete in time.
//!
//! The main entry points are [`race::Race`] for direct control over the
//! protocol and [`runner::RaceRunner`] for spawning racers onto a task pool
//! with cancellation propagation.

pub mod concurrency;
pub mod config;
pub mod environment;
pub mod error;
pub mod race;
pub mod racer;
pub mod runner;
pub mod stages;
pub mod types;

mod macros;

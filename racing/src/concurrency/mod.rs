//! Concurrency primitives used by the race coordinator.
//!
//! The race protocol needs exactly two coordination points beyond the shared
//! position counter: a completion latch that unblocks the initiator once every
//! racer has reported, and a shutdown signal through which an abandoned race
//! cancels outstanding racer work. Both are thin abstractions over tokio watch
//! channels so that any number of waiters observe the same event.

pub mod latch;
pub mod shutdown;

//! One-shot countdown latch over a watch channel.

use tokio::sync::watch;

/// A one-shot countdown synchronization primitive.
///
/// [`CountdownLatch`] starts at a fixed count and unblocks all waiters once
/// [`CountdownLatch::count_down`] has been called that many times. The count
/// never goes below zero and never resets; a latch is used for a single race
/// and discarded.
#[derive(Debug)]
pub struct CountdownLatch {
    count: watch::Sender<u32>,
}

impl CountdownLatch {
    /// Creates a latch that opens after `count` calls to [`CountdownLatch::count_down`].
    ///
    /// A latch created with a zero count is already open.
    pub fn new(count: u32) -> Self {
        let (tx, _) = watch::channel(count);
        Self { count: tx }
    }

    /// Decrements the count by one, saturating at zero.
    pub fn count_down(&self) {
        self.count.send_modify(|remaining| {
            *remaining = remaining.saturating_sub(1);
        });
    }

    /// Returns the current remaining count.
    pub fn remaining(&self) -> u32 {
        *self.count.borrow()
    }

    /// Waits until the count reaches zero.
    ///
    /// Resolves immediately if the latch is already open. Callers bound this
    /// wait with [`tokio::time::timeout`] when a deadline applies.
    pub async fn wait(&self) {
        let mut rx = self.count.subscribe();
        // The sender lives as long as `self`, so `wait_for` cannot observe a
        // closed channel here.
        let _ = rx.wait_for(|remaining| *remaining == 0).await;
    }
}

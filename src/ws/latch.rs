//! Countdown latch on top of `tokio::sync::watch`.
//!
//! The count lives in the watch channel, so a waiter that subscribes after the
//! latch reached zero still observes the release.

use std::time::Duration;
use tokio::sync::watch;

/// One-shot countdown latch.
#[derive(Debug)]
pub struct CountDownLatch {
    count: watch::Sender<usize>,
}

impl CountDownLatch {
    pub fn new(count: usize) -> Self {
        let (count, _) = watch::channel(count);
        Self { count }
    }

    /// Decrement the count, saturating at zero. Returns the new count.
    pub fn count_down(&self) -> usize {
        let mut remaining = 0;
        self.count.send_if_modified(|count| {
            let modified = *count > 0;
            if modified {
                *count -= 1;
            }
            remaining = *count;
            modified
        });
        remaining
    }

    pub fn count(&self) -> usize {
        *self.count.borrow()
    }

    pub fn is_released(&self) -> bool {
        self.count() == 0
    }

    /// Resolve once the count reaches zero.
    pub async fn released(&self) {
        let mut receiver = self.count.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = receiver.wait_for(|count| *count == 0).await;
    }

    /// Wait up to `timeout` for release. Returns whether the latch released.
    pub async fn wait(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.released()).await.is_ok()
    }
}

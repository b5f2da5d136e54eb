//! Batch completion tracking.
//!
//! A batch is a set of notifications handed to concurrent delivery workers.
//! Every delivery signals completion exactly once, whatever its outcome, so
//! the batch owner can wait for all of them.

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

/// Countdown latch shared by the deliveries of one batch.
#[derive(Debug)]
pub struct Batch {
    remaining: AtomicUsize,
    processed: AtomicUsize,
    notify: Notify,
}

impl Batch {
    pub fn new(size: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(size),
            processed: AtomicUsize::new(0),
            notify: Notify::new(),
        }
    }

    /// Record that one notification of this batch has finished processing.
    pub fn notification_processed(&self) {
        self.processed.fetch_add(1, Ordering::AcqRel);

        let previous = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));

        match previous {
            Ok(1) => self.notify.notify_waiters(),
            Ok(_) => {}
            Err(_) => tracing::warn!("Batch received more completions than notifications"),
        }
    }

    /// Guard that calls [`Batch::notification_processed`] when dropped.
    pub fn guard(&self) -> CompletionGuard<'_> {
        CompletionGuard { batch: self }
    }

    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::Acquire)
    }

    pub fn is_complete(&self) -> bool {
        self.remaining() == 0
    }

    /// Wait until every notification in the batch has been processed.
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_complete() {
                return;
            }
            notified.await;
        }
    }
}

/// Signals completion of one notification on every exit path, including unwinding.
#[must_use = "dropping the guard immediately signals completion"]
pub struct CompletionGuard<'a> {
    batch: &'a Batch,
}

impl Drop for CompletionGuard<'_> {
    fn drop(&mut self) {
        self.batch.notification_processed();
    }
}

//! This module provides the completion barrier shared by the pipeline stages.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Count of jobs whose outcome has been fully absorbed, and the barrier waiting for all of them.
///
/// Only the stages finalizing an outcome (the persister and the error collector) call [`Completion::absorb()`],
/// everything else just reads the count. The barrier is satisfied once the job source has sealed the total
/// and as many outcomes have been absorbed.
///
/// ```
/// # tokio_test::block_on(async {
/// # use downloader::completion::Completion;
/// let completion = Completion::new(2);
///
/// completion.absorb();
/// completion.absorb();
/// assert!(!completion.is_complete());
///
/// completion.seal(2);
/// completion.wait().await;
/// # })
/// ```
#[derive(Debug, Clone)]
pub struct Completion {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    absorbed: AtomicUsize,
    total: AtomicUsize,
    sealed: AtomicBool,
    notify: Notify,
}

impl Completion {
    /// Create a barrier expecting `total` jobs, until sealed with the actual count.
    pub fn new(total: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                absorbed: AtomicUsize::new(0),
                total: AtomicUsize::new(total),
                sealed: AtomicBool::new(false),
                notify: Notify::new(),
            }),
        }
    }

    /// Record one more absorbed outcome and return the new count.
    pub fn absorb(&self) -> usize {
        let absorbed = self.inner.absorbed.fetch_add(1, Ordering::AcqRel) + 1;

        if self.is_complete() {
            self.inner.notify.notify_waiters();
        }

        absorbed
    }

    /// Fix the total once every job has been admitted.
    pub fn seal(&self, total: usize) {
        self.inner.total.store(total, Ordering::Release);
        self.inner.sealed.store(true, Ordering::Release);

        self.inner.notify.notify_waiters();
    }

    #[inline]
    pub fn absorbed(&self) -> usize {
        self.inner.absorbed.load(Ordering::Acquire)
    }

    #[inline]
    pub fn total(&self) -> usize {
        self.inner.total.load(Ordering::Acquire)
    }

    pub fn is_complete(&self) -> bool {
        self.inner.sealed.load(Ordering::Acquire) && self.absorbed() >= self.total()
    }

    /// Wait until every job has been absorbed.
    pub async fn wait(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // register before checking, so that a notification in between is not lost
            notified.as_mut().enable();

            if self.is_complete() {
                return;
            }

            notified.await;
        }
    }
}

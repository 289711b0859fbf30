//! This module provides the admission gate bounding in-flight fetches.

use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub use tokio::sync::AcquireError;

/// A counting semaphore bounding how many jobs may be fetched at once.
///
/// Slots are handed out as [`Permit`]s and returned when the permit is dropped, so a slot is released exactly once
/// whatever way the guarded work ends.
///
/// ```
/// # tokio_test::block_on(async {
/// # use std::num::NonZeroUsize;
/// # use downloader::gate::AdmissionGate;
/// let gate = AdmissionGate::new(NonZeroUsize::new(2).unwrap());
///
/// let first = gate.acquire().await.unwrap();
/// let _second = gate.acquire().await.unwrap();
/// assert_eq!(gate.in_flight(), 2);
///
/// drop(first);
/// assert_eq!(gate.in_flight(), 1);
/// # })
/// ```
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl AdmissionGate {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity.get())),
            capacity: capacity.get(),
        }
    }

    /// Wait for a free slot.
    ///
    /// Fails only once the gate has been closed.
    pub async fn acquire(&self) -> Result<Permit, AcquireError> {
        let permit = Arc::clone(&self.semaphore).acquire_owned().await?;

        Ok(Permit { _permit: permit })
    }

    /// Refuse any further acquisition, waking up pending ones with an error.
    pub fn close(&self) {
        self.semaphore.close();
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently held.
    #[inline]
    pub fn in_flight(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }
}

/// A slot held on an [`AdmissionGate`], released on drop.
#[derive(Debug)]
#[must_use = "the slot is released as soon as the permit is dropped"]
pub struct Permit {
    _permit: OwnedSemaphorePermit,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_acquire_waits_for_release() {
        let gate = AdmissionGate::new(NonZeroUsize::new(1).unwrap());

        let permit = gate.acquire().await.unwrap();

        let blocked = tokio::time::timeout(Duration::from_millis(50), gate.acquire()).await;
        assert!(blocked.is_err(), "a second slot was handed out");

        drop(permit);

        let permit = tokio::time::timeout(Duration::from_millis(50), gate.acquire()).await;
        assert!(matches!(permit, Ok(Ok(_))));
    }

    #[tokio::test]
    async fn test_release_on_panicking_task() {
        let gate = AdmissionGate::new(NonZeroUsize::new(3).unwrap());

        let permit = gate.acquire().await.unwrap();
        let handle = tokio::spawn(async move {
            let _permit = permit;
            panic!("boom");
        });

        assert!(handle.await.unwrap_err().is_panic());
        assert_eq!(gate.in_flight(), 0);
        assert_eq!(gate.capacity(), 3);
    }

    #[tokio::test]
    async fn test_closed_gate_rejects() {
        let gate = AdmissionGate::new(NonZeroUsize::new(1).unwrap());
        gate.close();

        assert!(gate.acquire().await.is_err());
    }
}

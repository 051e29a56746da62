//! Admission control for concurrent sessions.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Default maximum number of concurrent sessions.
pub const DEFAULT_MAX_CLIENTS: usize = 3;

/// Bounds the number of simultaneously active sessions.
///
/// Acquisition never waits: a full server rejects instead of queuing.
#[derive(Debug, Clone)]
pub struct AdmissionController {
    capacity: usize,
    permits: Arc<Semaphore>,
}

/// One unit of session capacity.
///
/// The unit returns to the controller when the permit is released or dropped,
/// whichever happens first, so it is returned exactly once.
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionPermit {
    /// Return this unit to the pool.
    pub fn release(self) {
        drop(self._permit);
    }
}

impl AdmissionController {
    /// Create a controller with `capacity` permits.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            permits: Arc::new(Semaphore::new(capacity)),
        }
    }

    /// Take one permit if any is free.
    ///
    /// Returns `None` when the server is at capacity.
    pub fn try_acquire(&self) -> Option<AdmissionPermit> {
        self.permits
            .clone()
            .try_acquire_owned()
            .ok()
            .map(|permit| AdmissionPermit { _permit: permit })
    }

    /// Total permits.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits currently free.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Permits currently held by sessions.
    pub fn outstanding(&self) -> usize {
        self.capacity.saturating_sub(self.available())
    }
}

impl Default for AdmissionController {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CLIENTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_and_release() {
        let admission = AdmissionController::new(3);

        let first = admission.try_acquire().expect("first permit");
        let second = admission.try_acquire().expect("second permit");
        let third = admission.try_acquire().expect("third permit");
        assert!(admission.try_acquire().is_none()); // Capacity exhausted

        // Release one permit
        second.release();
        let again = admission.try_acquire().expect("released permit is reusable");

        // Still no more available
        assert!(admission.try_acquire().is_none());
        drop((first, third, again));
        assert_eq!(admission.available(), 3);
    }

    #[test]
    fn test_drop_releases() {
        let admission = AdmissionController::new(1);
        {
            let _permit = admission.try_acquire().expect("permit");
            assert_eq!(admission.outstanding(), 1);
            assert!(admission.try_acquire().is_none());
        }
        assert_eq!(admission.outstanding(), 0);
        assert!(admission.try_acquire().is_some());
    }

    #[test]
    fn test_clones_share_capacity() {
        let admission = AdmissionController::new(2);
        let other = admission.clone();
        let _a = admission.try_acquire().expect("permit");
        let _b = other.try_acquire().expect("permit");
        assert!(admission.try_acquire().is_none());
        assert_eq!(other.available(), 0);
        assert_eq!(other.capacity(), 2);
    }

    #[test]
    fn test_zero_capacity_rejects_everything() {
        let admission = AdmissionController::new(0);
        assert!(admission.try_acquire().is_none());
        assert_eq!(admission.outstanding(), 0);
    }
}

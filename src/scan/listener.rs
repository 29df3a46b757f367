//! Listener contracts and fan-out for the scan coordinators.
//!
//! Listeners are trait objects with default no-op methods, so consumers
//! implement only the events they care about. Notification order among
//! multiple listeners is unspecified. Listener methods are called
//! synchronously on bookkeeping tasks; the last-device transitions fire
//! while the coordinator still holds its session lock, so a listener that
//! blocks will stall the next `start`.

use crate::device::{DeviceRef, ScanMode};
use std::sync::{Arc, Mutex, MutexGuard};

/// Lifecycle events of a wire-scanner acquisition.
pub trait ScanControllerListener: Send + Sync {
    /// A session was accepted and scan commands were dispatched.
    fn scan_initiated(&self, _devices: &[DeviceRef], _mode: ScanMode) {}

    /// Every device finished its scanning phase. `devices` lists the
    /// session's completions; failed devices are absent.
    fn scan_completed(&self, _devices: &[DeviceRef]) {}

    /// The session was aborted by operator request.
    fn scan_aborted(&self) {}

    /// Every actuator returned to its park position; the session is over.
    fn actuators_parked(&self) {}

    /// Actuator motion was halted in place. The session stays active.
    fn actuators_stopped(&self) {}

    /// A device reported a fault and was dropped from the session.
    fn device_failure(&self, _device: &DeviceRef) {}
}

/// Lifecycle events of a wire-harp acquisition.
pub trait HarpControllerListener: Send + Sync {
    /// A session was accepted with the given per-device sample target.
    fn daq_initiated(&self, _devices: &[DeviceRef], _sample_count: u32) {}

    /// A device delivered one sample; `samples_taken` is the 1-based count.
    fn device_sampled(&self, _device: &DeviceRef, _samples_taken: u32) {}

    /// Every device reached its sample target.
    fn daq_completed(&self, _devices: &[DeviceRef]) {}

    /// The session was aborted by operator request.
    fn daq_aborted(&self) {}

    /// A device reported a fault and was dropped from the session.
    fn device_failure(&self, _device: &DeviceRef) {}
}

/// A registry of listeners, notified by snapshot so registration during a
/// fan-out cannot deadlock.
pub struct ListenerSet<L: ?Sized> {
    listeners: Mutex<Vec<Arc<L>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl<L: ?Sized> ListenerSet<L> {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Register a listener. Registering the same `Arc` twice notifies it
    /// twice.
    pub fn register(&self, listener: Arc<L>) {
        lock(&self.listeners).push(listener);
    }

    /// Remove a listener by pointer identity.
    pub fn remove(&self, listener: &Arc<L>) {
        lock(&self.listeners).retain(|l| !Arc::ptr_eq(l, listener));
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        lock(&self.listeners).len()
    }

    /// True when no listeners are registered.
    pub fn is_empty(&self) -> bool {
        lock(&self.listeners).is_empty()
    }

    /// Invoke `f` on every registered listener.
    pub fn notify(&self, f: impl Fn(&L)) {
        let snapshot: Vec<Arc<L>> = lock(&self.listeners).clone();
        for listener in snapshot {
            f(listener.as_ref());
        }
    }
}

impl<L: ?Sized> Default for ListenerSet<L> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter {
        aborts: AtomicUsize,
    }

    impl ScanControllerListener for Counter {
        fn scan_aborted(&self) {
            self.aborts.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn notify_reaches_all_registered() {
        let set: ListenerSet<dyn ScanControllerListener> = ListenerSet::new();
        let a = Arc::new(Counter {
            aborts: AtomicUsize::new(0),
        });
        let b = Arc::new(Counter {
            aborts: AtomicUsize::new(0),
        });
        set.register(a.clone());
        set.register(b.clone());

        set.notify(|l| l.scan_aborted());
        assert_eq!(a.aborts.load(Ordering::SeqCst), 1);
        assert_eq!(b.aborts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn remove_is_by_pointer_identity() {
        let set: ListenerSet<dyn ScanControllerListener> = ListenerSet::new();
        let a = Arc::new(Counter {
            aborts: AtomicUsize::new(0),
        });
        let b = Arc::new(Counter {
            aborts: AtomicUsize::new(0),
        });
        set.register(a.clone());
        set.register(b.clone());

        let a_dyn: Arc<dyn ScanControllerListener> = a.clone();
        set.remove(&a_dyn);
        set.notify(|l| l.scan_aborted());

        assert_eq!(a.aborts.load(Ordering::SeqCst), 0);
        assert_eq!(b.aborts.load(Ordering::SeqCst), 1);
        assert_eq!(set.len(), 1);
    }
}

//! Scan coordinator for wire harps.
//!
//! Simpler than the wire-scanner variant: harps have no fork to park, so
//! there is no limit-switch phase and no unparked list. Each device is
//! tracked by a single monitor on a representative sample field; sample
//! deliveries count toward a caller-specified target, and the delivery
//! that completes the count is the device's one fused terminal event.
//!
//! The coordinator dispatches no start command to the hardware: sampling
//! is assumed to be triggered externally (timing system or a prior device
//! setup) before `daq_start` is called. `daq_start` only attaches
//! monitors and begins counting.

use crate::config::Settings;
use crate::device::{DeviceRef, FieldDescriptor};
use crate::gateway::{CommandGateway, FieldCallback};
use crate::progress::{SampleAction, SampleProgress};
use crate::scan::listener::{HarpControllerListener, ListenerSet};
use crate::scan::session::{ScanSession, SessionStatus};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

fn lock<T>(m: &StdMutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Coordinator for wire-harp acquisitions.
#[derive(Clone)]
pub struct HarpCoordinator {
    inner: Arc<HarpInner>,
}

struct HarpInner {
    gateway: Arc<dyn CommandGateway>,
    session: Mutex<ScanSession>,
    listeners: ListenerSet<dyn HarpControllerListener>,
    default_sample_count: u32,
}

impl HarpCoordinator {
    /// Create a coordinator over the given gateway.
    pub fn new(gateway: Arc<dyn CommandGateway>, settings: &Settings) -> Self {
        Self {
            inner: Arc::new(HarpInner {
                gateway,
                session: Mutex::new(ScanSession::new()),
                listeners: ListenerSet::new(),
                default_sample_count: settings.scan.harp_sample_count,
            }),
        }
    }

    /// Register a lifecycle listener.
    pub fn register_listener(&self, listener: Arc<dyn HarpControllerListener>) {
        self.inner.listeners.register(listener);
    }

    /// Remove a previously registered listener (by pointer identity).
    pub fn remove_listener(&self, listener: &Arc<dyn HarpControllerListener>) {
        self.inner.listeners.remove(listener);
    }

    /// Snapshot of the session state for UI polling.
    pub async fn status(&self) -> SessionStatus {
        self.inner.session.lock().await.status()
    }

    /// Start counting samples from `devices` toward `sample_count` per
    /// device. A `sample_count` of 0 selects the configured default.
    ///
    /// Precondition: sampling must already be running on the hardware; no
    /// start command is dispatched. Returns `true` iff the session was
    /// accepted (monitors registered and activated, active flag raised,
    /// `daq_initiated` fired); `false` when a session is already in
    /// progress, `devices` is empty, or monitor setup fails.
    pub async fn daq_start(&self, devices: &[DeviceRef], sample_count: u32) -> bool {
        if devices.is_empty() {
            warn!("harp daq start requested with no devices");
            return false;
        }
        let sample_count = if sample_count == 0 {
            self.inner.default_sample_count
        } else {
            sample_count
        };

        let mut session = self.inner.session.lock().await;
        if session.active() {
            debug!("harp daq start rejected: session already in progress");
            return false;
        }

        let handle = Handle::current();
        for device in devices {
            let callback = sample_callback(&self.inner, device, sample_count, &handle);
            match self
                .inner
                .gateway
                .create_subscription(device, FieldDescriptor::SampleArray, callback)
            {
                Ok(sub) => session.monitors_mut().add(sub),
                Err(err) => {
                    warn!(device = %device, error = %err, "monitor registration failed, daq not started");
                    session.monitors_mut().empty();
                    return false;
                }
            }
        }
        if let Err(err) = session.monitors().begin() {
            warn!(error = %err, "monitor activation failed, daq not started");
            session.monitors_mut().empty();
            return false;
        }

        let run_id = session.begin(devices, false);
        info!(%run_id, devices = devices.len(), sample_count, "harp daq session started");
        self.inner
            .listeners
            .notify(|l| l.daq_initiated(devices, sample_count));
        true
    }

    /// Abort the in-flight session.
    ///
    /// Harps have no abort command; this only force-terminates the
    /// session and fires `daq_aborted`. A no-op when no session is
    /// active.
    pub async fn daq_abort(&self) {
        let mut session = self.inner.session.lock().await;
        if !session.active() {
            debug!("harp abort requested with no active session");
            return;
        }
        let run_id = session.run_id();
        session.terminate();
        info!(?run_id, "harp daq session aborted");
        self.inner.listeners.notify(|l| l.daq_aborted());
    }
}

impl HarpInner {
    /// Bookkeeping for one real sample delivery. The delivery that reaches
    /// the target also completes the device; when the last device
    /// completes, the session ends.
    async fn record_sample(&self, device: &DeviceRef, progress: SampleProgress) {
        let mut session = self.session.lock().await;
        if !session.is_scanning(device) {
            return;
        }
        debug!(device = %device, sample = progress.index, "harp sample taken");
        self.listeners
            .notify(|l| l.device_sampled(device, progress.index));

        if !progress.last {
            return;
        }
        session.remove_scanning(device);
        session.push_completed(device.clone());
        if session.scanning_devices().is_empty() {
            let completed = session.completed_devices().to_vec();
            info!(run_id = ?session.run_id(), "all harps sampled, session complete");
            session.close();
            self.listeners.notify(|l| l.daq_completed(&completed));
        }
    }
}

/// Build the sample-field callback for one harp.
fn sample_callback(
    inner: &Arc<HarpInner>,
    device: &DeviceRef,
    sample_count: u32,
    handle: &Handle,
) -> FieldCallback {
    let samples = Arc::new(StdMutex::new(SampleAction::new(sample_count)));
    let inner = Arc::clone(inner);
    let device = device.clone();
    let handle = handle.clone();
    Arc::new(move |_event| {
        let progress = match lock(&samples).observe() {
            Some(progress) => progress,
            None => return,
        };
        let inner = Arc::clone(&inner);
        let device = device.clone();
        handle.spawn(async move {
            inner.record_sample(&device, progress).await;
        });
    })
}

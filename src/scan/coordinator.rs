//! Scan coordinator for wire scanners.
//!
//! Drives one data-acquisition cycle across a set of wire scanners: issues
//! the mode-specific scan command to every device, tracks each device from
//! commanded through scanning to parked via monitor callbacks, and fans
//! lifecycle events out to registered listeners.
//!
//! # Concurrency
//!
//! All shared state lives in one [`ScanSession`] behind a single
//! `tokio::sync::Mutex`; `start`/`abort`/`park_actuators`/`stop_actuators`
//! and the callback-driven bookkeeping tasks serialize on it. Critical
//! sections are short, and the "last device" checks run inside the same
//! lock acquisition that removed the device, so session-terminal
//! transitions fire exactly once. Field-change callbacks arrive on gateway
//! threads and are not reentrant; they never touch the session inline but
//! spawn a bookkeeping task onto the runtime instead.
//!
//! At most one session may be in progress per coordinator. `start` while a
//! session is active returns `false` with no side effects.

use crate::config::Settings;
use crate::device::{DeviceCommand, DeviceRef, FieldDescriptor, ScanMode};
use crate::error::GatewayError;
use crate::gateway::{CommandGateway, FieldCallback, Subscription};
use crate::progress::{FaultAction, LimitSwitchAction, SequenceAction};
use crate::scan::listener::{ListenerSet, ScanControllerListener};
use crate::scan::session::{ScanSession, SessionStatus};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

fn lock<T>(m: &StdMutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Coordinator for wire-scanner acquisitions.
///
/// Construct one per process at wiring time and share it by cloning; all
/// clones drive the same session.
#[derive(Clone)]
pub struct ScanCoordinator {
    inner: Arc<ScanInner>,
}

struct ScanInner {
    gateway: Arc<dyn CommandGateway>,
    session: Mutex<ScanSession>,
    listeners: ListenerSet<dyn ScanControllerListener>,
    command_timeout: Duration,
}

impl ScanCoordinator {
    /// Create a coordinator over the given gateway.
    pub fn new(gateway: Arc<dyn CommandGateway>, settings: &Settings) -> Self {
        Self {
            inner: Arc::new(ScanInner {
                gateway,
                session: Mutex::new(ScanSession::new()),
                listeners: ListenerSet::new(),
                command_timeout: settings.scan.command_timeout,
            }),
        }
    }

    /// Register a lifecycle listener.
    pub fn register_listener(&self, listener: Arc<dyn ScanControllerListener>) {
        self.inner.listeners.register(listener);
    }

    /// Remove a previously registered listener (by pointer identity).
    pub fn remove_listener(&self, listener: &Arc<dyn ScanControllerListener>) {
        self.inner.listeners.remove(listener);
    }

    /// Snapshot of the session state for UI polling.
    pub async fn status(&self) -> SessionStatus {
        self.inner.session.lock().await.status()
    }

    /// Start an acquisition cycle over `devices` in the given mode.
    ///
    /// Returns `true` iff the session was accepted: monitors registered
    /// and activated, scan commands dispatched to every device, the active
    /// flag raised, and `scan_initiated` fired. Returns `false` without
    /// side effects when a session is already in progress or `devices` is
    /// empty; returns `false` after tearing the partial session down when
    /// monitor setup or any command dispatch fails. Failures are logged,
    /// not propagated.
    pub async fn start(&self, devices: &[DeviceRef], mode: ScanMode) -> bool {
        if devices.is_empty() {
            warn!("scan start requested with no devices");
            return false;
        }
        let mut session = self.inner.session.lock().await;
        if session.active() {
            debug!("scan start rejected: session already in progress");
            return false;
        }

        // Wire up monitors before anything else touches the hardware. A
        // registration failure aborts the attempt with no commands sent.
        let handle = Handle::current();
        let mut subs: Vec<Box<dyn Subscription>> = Vec::with_capacity(devices.len() * 3);
        for device in devices {
            match scanner_monitors(&self.inner, device, &handle) {
                Ok(device_subs) => subs.extend(device_subs),
                Err(err) => {
                    warn!(device = %device, error = %err, "monitor registration failed, scan not started");
                    return false;
                }
            }
        }
        for sub in subs {
            session.monitors_mut().add(sub);
        }
        if let Err(err) = session.monitors().begin() {
            warn!(error = %err, "monitor activation failed, scan not started");
            session.monitors_mut().empty();
            return false;
        }

        let run_id = session.begin(devices, true);
        info!(%run_id, devices = devices.len(), %mode, "scan session started");

        for device in devices {
            if let Err(err) = self.inner.dispatch(device, mode.scan_command()).await {
                // One device refusing its scan command invalidates the
                // whole cycle: tear down and report failure to the caller.
                warn!(%run_id, device = %device, error = %err, "scan command failed, terminating session");
                session.terminate();
                return false;
            }
        }

        self.inner
            .listeners
            .notify(|l| l.scan_initiated(devices, mode));
        true
    }

    /// Abort the in-flight session.
    ///
    /// Dispatches an abort command to every device still scanning (logging
    /// per-device failures), force-terminates the session, and fires
    /// `scan_aborted`. A no-op when no session is active.
    pub async fn abort(&self) {
        let mut session = self.inner.session.lock().await;
        if !session.active() {
            debug!("abort requested with no active session");
            return;
        }
        let run_id = session.run_id();
        for device in session.scanning_devices().to_vec() {
            if let Err(err) = self.inner.dispatch(&device, DeviceCommand::Abort).await {
                warn!(device = %device, error = %err, "abort command failed");
            }
        }
        session.terminate();
        info!(?run_id, "scan session aborted");
        self.inner.listeners.notify(|l| l.scan_aborted());
    }

    /// Send every unparked actuator back to its park position and end the
    /// session.
    ///
    /// Per-device dispatch failures are logged and do not stop commands to
    /// sibling devices. Fires `actuators_parked` after termination.
    pub async fn park_actuators(&self) {
        let mut session = self.inner.session.lock().await;
        for device in session.unparked_devices().to_vec() {
            if let Err(err) = self.inner.dispatch(&device, DeviceCommand::Park).await {
                warn!(device = %device, error = %err, "park command failed");
            }
        }
        session.terminate();
        self.inner.listeners.notify(|l| l.actuators_parked());
    }

    /// Halt every unparked actuator in place.
    ///
    /// Dispatch-only: the session stays active and the lists are
    /// untouched. Fires `actuators_stopped`.
    pub async fn stop_actuators(&self) {
        let session = self.inner.session.lock().await;
        for device in session.unparked_devices().to_vec() {
            if let Err(err) = self.inner.dispatch(&device, DeviceCommand::Stop).await {
                warn!(device = %device, error = %err, "stop command failed");
            }
        }
        self.inner.listeners.notify(|l| l.actuators_stopped());
    }
}

impl ScanInner {
    async fn dispatch(
        &self,
        device: &DeviceRef,
        command: DeviceCommand,
    ) -> Result<(), GatewayError> {
        match timeout(self.command_timeout, self.gateway.run_command(device, command)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(self.command_timeout)),
        }
    }

    /// Bookkeeping for a device's first sequence increment: its scanning
    /// phase is over, though the fork is still returning to park.
    async fn finish_scanning(&self, device: &DeviceRef) {
        let mut session = self.session.lock().await;
        if !session.remove_scanning(device) {
            return;
        }
        session.push_completed(device.clone());
        debug!(device = %device, remaining = session.scanning_devices().len(), "device finished scanning");
        if session.scanning_devices().is_empty() {
            let completed = session.completed_devices().to_vec();
            info!(run_id = ?session.run_id(), "all devices finished scanning");
            self.listeners.notify(|l| l.scan_completed(&completed));
        }
    }

    /// Bookkeeping for a parked fork. When the last fork parks, the
    /// session is over.
    async fn finish_parking(&self, device: &DeviceRef) {
        let mut session = self.session.lock().await;
        if !session.remove_unparked(device) {
            return;
        }
        debug!(device = %device, remaining = session.unparked_devices().len(), "device parked");
        if session.unparked_devices().is_empty() && session.active() {
            info!(run_id = ?session.run_id(), "all actuators parked, session complete");
            session.close();
            self.listeners.notify(|l| l.actuators_parked());
        }
    }

    /// Bookkeeping for a device fault: drop its monitors, make a
    /// best-effort attempt to park it, remove it from tracking, and notify
    /// listeners. Sibling devices continue; if the failed device was the
    /// last one outstanding, the ordinary completion transitions fire.
    async fn handle_device_failure(&self, device: &DeviceRef) {
        let mut session = self.session.lock().await;
        session.monitors_mut().stop_device(device);
        if let Err(err) = self.dispatch(device, DeviceCommand::Park).await {
            warn!(device = %device, error = %err, "best-effort park of failed device failed");
        }
        let was_scanning = session.remove_scanning(device);
        let was_unparked = session.remove_unparked(device);
        if !was_scanning && !was_unparked {
            return;
        }
        warn!(device = %device, "device failure, dropped from session");
        self.listeners.notify(|l| l.device_failure(device));

        if was_scanning && session.scanning_devices().is_empty() && session.active() {
            let completed = session.completed_devices().to_vec();
            self.listeners.notify(|l| l.scan_completed(&completed));
        }
        if was_unparked && session.unparked_devices().is_empty() && session.active() {
            session.close();
            self.listeners.notify(|l| l.actuators_parked());
        }
    }
}

/// Build the three monitor subscriptions for one scanner.
///
/// The sequence-id and limit-switch trackers are shared: the first real
/// sequence increment both completes the device's scanning phase and arms
/// the limit-switch watcher, so a stale park reading seen before the scan
/// finishes is ignored.
fn scanner_monitors(
    inner: &Arc<ScanInner>,
    device: &DeviceRef,
    handle: &Handle,
) -> Result<Vec<Box<dyn Subscription>>, GatewayError> {
    let seq = Arc::new(StdMutex::new(SequenceAction::new()));
    let limit = Arc::new(StdMutex::new(LimitSwitchAction::new()));
    let fault = Arc::new(StdMutex::new(FaultAction::new()));

    let seq_cb: FieldCallback = {
        let inner = Arc::clone(inner);
        let device = device.clone();
        let handle = handle.clone();
        let limit = Arc::clone(&limit);
        Arc::new(move |_event| {
            if !lock(&seq).observe() {
                return;
            }
            lock(&limit).unblock();
            let inner = Arc::clone(&inner);
            let device = device.clone();
            handle.spawn(async move {
                inner.finish_scanning(&device).await;
            });
        })
    };

    let limit_cb: FieldCallback = {
        let inner = Arc::clone(inner);
        let device = device.clone();
        let handle = handle.clone();
        Arc::new(move |event| {
            if !lock(&limit).observe(event.value != 0.0) {
                return;
            }
            let inner = Arc::clone(&inner);
            let device = device.clone();
            handle.spawn(async move {
                inner.finish_parking(&device).await;
            });
        })
    };

    let fault_cb: FieldCallback = {
        let inner = Arc::clone(inner);
        let device = device.clone();
        let handle = handle.clone();
        Arc::new(move |event| {
            if !lock(&fault).observe(event.value != 0.0) {
                return;
            }
            let inner = Arc::clone(&inner);
            let device = device.clone();
            handle.spawn(async move {
                inner.handle_device_failure(&device).await;
            });
        })
    };

    Ok(vec![
        inner
            .gateway
            .create_subscription(device, FieldDescriptor::SequenceId, seq_cb)?,
        inner
            .gateway
            .create_subscription(device, FieldDescriptor::LimitSwitch, limit_cb)?,
        inner
            .gateway
            .create_subscription(device, FieldDescriptor::ScanError, fault_cb)?,
    ])
}

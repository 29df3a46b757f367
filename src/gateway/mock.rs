//! Mock gateway for tests and headless runs.
//!
//! Simulates the control-system gateway without hardware:
//!
//! - records every dispatched command for later assertion
//! - lets tests script per-command failures, monitor-start failures,
//!   subscription refusal, and dispatch latency
//! - delivers field events on demand via [`MockGateway::fire`]
//! - replays one initialization echo when a subscription starts, matching
//!   Channel Access monitor semantics

use super::{CommandGateway, FieldCallback, FieldEvent, Subscription};
use crate::device::{DeviceCommand, DeviceRef, FieldDescriptor};
use crate::error::GatewayError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::sleep;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

struct SubState {
    device: DeviceRef,
    field: FieldDescriptor,
    callback: FieldCallback,
    started: AtomicBool,
    stopped: AtomicBool,
}

/// Subscription handle returned by [`MockGateway::create_subscription`].
pub struct MockSubscription {
    state: Arc<SubState>,
    fail_start_for: Arc<Mutex<HashSet<String>>>,
    initial: Arc<Mutex<HashMap<(String, FieldDescriptor), f64>>>,
}

impl Subscription for MockSubscription {
    fn device(&self) -> &DeviceRef {
        &self.state.device
    }

    fn field(&self) -> FieldDescriptor {
        self.state.field
    }

    fn start(&self) -> Result<(), GatewayError> {
        if lock(&self.fail_start_for).contains(self.state.device.id()) {
            return Err(GatewayError::Monitor(format!(
                "{}.{}",
                self.state.device,
                self.state.field
            )));
        }
        if self.state.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        // Initialization echo: current value, delivered inline like a CA
        // monitor's first callback.
        let value = lock(&self.initial)
            .get(&(self.state.device.id().to_string(), self.state.field))
            .copied()
            .unwrap_or(0.0);
        (self.state.callback)(&FieldEvent {
            device: self.state.device.clone(),
            field: self.state.field,
            value,
        });
        Ok(())
    }

    fn stop(&self) {
        self.state.stopped.store(true, Ordering::SeqCst);
    }
}

/// In-memory [`CommandGateway`] with scriptable failures.
///
/// # Example
///
/// ```rust,ignore
/// let gateway = Arc::new(MockGateway::new());
/// let coordinator = ScanCoordinator::new(gateway.clone(), &settings);
/// coordinator.start(&[ws14.clone()], ScanMode::Easy).await;
/// gateway.fire(&ws14, FieldDescriptor::SequenceId, 1.0);
/// ```
#[derive(Default)]
pub struct MockGateway {
    commands: Mutex<Vec<(DeviceRef, DeviceCommand)>>,
    fail_commands: Mutex<HashSet<(String, DeviceCommand)>>,
    fail_start_for: Arc<Mutex<HashSet<String>>>,
    refuse_subscriptions: AtomicBool,
    command_delay: Mutex<Option<Duration>>,
    initial: Arc<Mutex<HashMap<(String, FieldDescriptor), f64>>>,
    subs: Mutex<Vec<Arc<SubState>>>,
}

impl MockGateway {
    /// Create a mock gateway with no scripted failures.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every dispatch of `command` to `device` fail with a put error.
    pub fn fail_command(&self, device: &DeviceRef, command: DeviceCommand) {
        lock(&self.fail_commands).insert((device.id().to_string(), command));
    }

    /// Make monitor activation fail for all of `device`'s subscriptions.
    pub fn fail_monitor_start(&self, device: &DeviceRef) {
        lock(&self.fail_start_for).insert(device.id().to_string());
    }

    /// Make all future subscription registrations fail with a connection
    /// error.
    pub fn refuse_subscriptions(&self) {
        self.refuse_subscriptions.store(true, Ordering::SeqCst);
    }

    /// Delay every command dispatch by `delay` (for timeout tests).
    pub fn set_command_delay(&self, delay: Duration) {
        *lock(&self.command_delay) = Some(delay);
    }

    /// Set the value replayed as the initialization echo for a field.
    /// Defaults to 0.0.
    pub fn set_initial(&self, device: &DeviceRef, field: FieldDescriptor, value: f64) {
        lock(&self.initial).insert((device.id().to_string(), field), value);
    }

    /// All commands dispatched so far, in order.
    pub fn commands(&self) -> Vec<(DeviceRef, DeviceCommand)> {
        lock(&self.commands).clone()
    }

    /// Commands dispatched to one device, in order.
    pub fn commands_for(&self, device: &DeviceRef) -> Vec<DeviceCommand> {
        lock(&self.commands)
            .iter()
            .filter(|(d, _)| d == device)
            .map(|(_, c)| *c)
            .collect()
    }

    /// Number of subscriptions that are started and not stopped.
    pub fn active_monitor_count(&self) -> usize {
        lock(&self.subs)
            .iter()
            .filter(|s| s.started.load(Ordering::SeqCst) && !s.stopped.load(Ordering::SeqCst))
            .count()
    }

    /// Deliver a field event to every live subscription on that field.
    ///
    /// Callbacks run inline on the calling thread, like a gateway worker
    /// thread would.
    pub fn fire(&self, device: &DeviceRef, field: FieldDescriptor, value: f64) {
        let targets: Vec<Arc<SubState>> = lock(&self.subs)
            .iter()
            .filter(|s| {
                s.device == *device
                    && s.field == field
                    && s.started.load(Ordering::SeqCst)
                    && !s.stopped.load(Ordering::SeqCst)
            })
            .cloned()
            .collect();
        for sub in targets {
            (sub.callback)(&FieldEvent {
                device: device.clone(),
                field,
                value,
            });
        }
    }
}

#[async_trait]
impl CommandGateway for MockGateway {
    async fn run_command(
        &self,
        device: &DeviceRef,
        command: DeviceCommand,
    ) -> Result<(), GatewayError> {
        let delay = *lock(&self.command_delay);
        if let Some(delay) = delay {
            sleep(delay).await;
        }
        if lock(&self.fail_commands).contains(&(device.id().to_string(), command)) {
            return Err(GatewayError::Put(format!("{device}:{command}")));
        }
        lock(&self.commands).push((device.clone(), command));
        Ok(())
    }

    fn create_subscription(
        &self,
        device: &DeviceRef,
        field: FieldDescriptor,
        callback: FieldCallback,
    ) -> Result<Box<dyn Subscription>, GatewayError> {
        if self.refuse_subscriptions.load(Ordering::SeqCst) {
            return Err(GatewayError::Connection(format!("{device}.{field}")));
        }
        let state = Arc::new(SubState {
            device: device.clone(),
            field,
            callback,
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        });
        lock(&self.subs).push(Arc::clone(&state));
        Ok(Box::new(MockSubscription {
            state,
            fail_start_for: Arc::clone(&self.fail_start_for),
            initial: Arc::clone(&self.initial),
        }))
    }
}

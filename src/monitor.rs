//! Monitor pool: owns the field-change subscriptions of one scan session.

use crate::device::DeviceRef;
use crate::error::GatewayError;
use crate::gateway::Subscription;
use tracing::debug;

/// The set of live field-change subscriptions for the current session.
///
/// Registration and activation are separate steps: `add` collects
/// subscriptions while the session is being wired up, `begin` activates
/// delivery for the whole batch. If `begin` fails, the caller treats the
/// batch as dead and calls [`MonitorPool::empty`].
#[derive(Default)]
pub struct MonitorPool {
    subs: Vec<Box<dyn Subscription>>,
}

impl MonitorPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscription without starting delivery.
    pub fn add(&mut self, sub: Box<dyn Subscription>) {
        self.subs.push(sub);
    }

    /// Number of registered subscriptions.
    pub fn len(&self) -> usize {
        self.subs.len()
    }

    /// True when no subscriptions are registered.
    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }

    /// Activate delivery for every registered subscription.
    ///
    /// Stops at the first activation failure; subscriptions started before
    /// the failure stay live until the caller empties the pool.
    pub fn begin(&self) -> Result<(), GatewayError> {
        for sub in &self.subs {
            sub.start()?;
        }
        debug!(monitors = self.subs.len(), "monitor pool active");
        Ok(())
    }

    /// Tear down only the subscriptions belonging to one device.
    pub fn stop_device(&mut self, device: &DeviceRef) {
        self.subs.retain(|sub| {
            if sub.device() == device {
                sub.stop();
                false
            } else {
                true
            }
        });
    }

    /// Tear down every subscription in the pool.
    pub fn empty(&mut self) {
        for sub in &self.subs {
            sub.stop();
        }
        let dropped = self.subs.len();
        self.subs.clear();
        if dropped > 0 {
            debug!(monitors = dropped, "monitor pool emptied");
        }
    }
}

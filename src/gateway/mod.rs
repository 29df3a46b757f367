//! The seam to the external accelerator control framework.
//!
//! Real deployments back [`CommandGateway`] with the control system's
//! Channel Access client: commands become channel puts and subscriptions
//! become CA monitors. This crate only defines the trait surface the scan
//! coordinators consume; [`mock::MockGateway`] provides an in-memory
//! implementation for tests and headless runs.
//!
//! # Delivery contract
//!
//! Field-change callbacks are invoked on gateway-owned threads, and the
//! transport is not reentrant. Callbacks must return quickly and must not
//! call back into the gateway synchronously; the coordinators honor this by
//! spawning bookkeeping tasks onto the tokio runtime instead of doing list
//! mutation inline.
//!
//! Monitors deliver one initialization echo (the current field value) when
//! activated. Consumers are expected to discard the first delivery.

pub mod mock;

use crate::device::{DeviceCommand, DeviceRef, FieldDescriptor};
use crate::error::GatewayError;
use async_trait::async_trait;
use std::sync::Arc;

/// One field-change notification from a device.
#[derive(Debug, Clone)]
pub struct FieldEvent {
    /// Device the field belongs to.
    pub device: DeviceRef,
    /// Which monitored field changed.
    pub field: FieldDescriptor,
    /// New field value. Flag-like fields report zero/nonzero.
    pub value: f64,
}

/// Callback invoked for each field-change delivery.
///
/// Runs on an arbitrary gateway thread; see the module docs for the
/// non-blocking contract.
pub type FieldCallback = Arc<dyn Fn(&FieldEvent) + Send + Sync>;

/// Command dispatch and monitor registration for diagnostic devices.
#[async_trait]
pub trait CommandGateway: Send + Sync {
    /// Dispatch a named command to a device.
    async fn run_command(
        &self,
        device: &DeviceRef,
        command: DeviceCommand,
    ) -> Result<(), GatewayError>;

    /// Register a field-change subscription.
    ///
    /// Registration alone does not start delivery; call
    /// [`Subscription::start`] (normally via the coordinator's monitor pool)
    /// to activate it.
    fn create_subscription(
        &self,
        device: &DeviceRef,
        field: FieldDescriptor,
        callback: FieldCallback,
    ) -> Result<Box<dyn Subscription>, GatewayError>;
}

/// A registered field-change subscription.
pub trait Subscription: Send + Sync {
    /// Device this subscription watches.
    fn device(&self) -> &DeviceRef;

    /// Field this subscription watches.
    fn field(&self) -> FieldDescriptor;

    /// Activate delivery. The first delivery is the initialization echo.
    fn start(&self) -> Result<(), GatewayError>;

    /// Tear the subscription down. Idempotent; no deliveries occur after
    /// this returns.
    fn stop(&self);
}

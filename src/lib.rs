//! # wirescan-daq
//!
//! Scan controllers for wire-scanner and wire-harp beam-profile data
//! acquisition. This crate implements the coordination core of a profile
//! diagnostics application: driving a set of hardware actuators through an
//! acquisition cycle in parallel, tracking per-device progress from
//! asynchronous field-change callbacks, enforcing a single-active-scan
//! invariant, and recovering cleanly from partial failures (one device
//! faulting while siblings continue, operator abort mid-flight, forced
//! termination).
//!
//! Device I/O itself belongs to the external control system: commands and
//! field monitors go through the [`gateway::CommandGateway`] trait, backed
//! in production by the facility's Channel Access client and in tests by
//! [`gateway::mock::MockGateway`].
//!
//! ## Crate Structure
//!
//! - **`config`**: Figment-based settings (TOML file + `WIRESCAN_`
//!   environment variables) with validation.
//! - **`device`**: device references and the command/field vocabulary.
//! - **`error`**: gateway error taxonomy (setup vs. dispatch failures).
//! - **`gateway`**: the control-system seam and its mock implementation.
//! - **`monitor`**: the per-session pool of field-change subscriptions.
//! - **`progress`**: per-device trackers that turn raw field deliveries
//!   into lifecycle transitions (echo skip, unblock handshake, sample
//!   counting).
//! - **`scan`**: the coordinators themselves — [`scan::ScanCoordinator`]
//!   for wire scanners, [`scan::HarpCoordinator`] for wire harps — plus
//!   session state and listener contracts.
//! - **`telemetry`**: structured-logging initialization.

pub mod config;
pub mod device;
pub mod error;
pub mod gateway;
pub mod monitor;
pub mod progress;
pub mod scan;
pub mod telemetry;

pub use config::Settings;
pub use device::{DeviceCommand, DeviceKind, DeviceRef, FieldDescriptor, ScanMode};
pub use error::GatewayError;
pub use gateway::{CommandGateway, FieldCallback, FieldEvent, Subscription};
pub use scan::{
    HarpControllerListener, HarpCoordinator, ScanControllerListener, ScanCoordinator,
    SessionStatus,
};

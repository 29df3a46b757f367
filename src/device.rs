//! Device identity and the command/field vocabulary for profile diagnostics.
//!
//! A [`DeviceRef`] names one physical diagnostic device in the accelerator
//! topology. The coordinator never owns the device; it only holds references
//! and routes commands and monitor subscriptions through the
//! [`crate::gateway::CommandGateway`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of profile diagnostic hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    /// A movable-fork wire scanner with a park position and limit switch.
    WireScanner,
    /// A fixed wire harp sampled in place.
    WireHarp,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::WireScanner => write!(f, "wire-scanner"),
            DeviceKind::WireHarp => write!(f, "wire-harp"),
        }
    }
}

/// Reference to one diagnostic device in the externally-managed topology.
///
/// Cheap to clone; equality is by id and kind. The id is the control-system
/// device name (e.g. `MEBT_Diag:WS14`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceRef {
    id: String,
    kind: DeviceKind,
}

impl DeviceRef {
    /// Reference a wire scanner by control-system name.
    pub fn scanner(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: DeviceKind::WireScanner,
        }
    }

    /// Reference a wire harp by control-system name.
    pub fn harp(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: DeviceKind::WireHarp,
        }
    }

    /// Control-system device name.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Hardware kind.
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }
}

impl fmt::Display for DeviceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Scan profile selected by the operator for a wire-scanner acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Preconfigured scan using the device's stored parameters.
    Easy,
    /// Scan using the operator-edited parameter set.
    Expert,
}

impl ScanMode {
    /// The device command that starts a scan in this mode.
    pub fn scan_command(self) -> DeviceCommand {
        match self {
            ScanMode::Easy => DeviceCommand::ScanEasy,
            ScanMode::Expert => DeviceCommand::ScanExpert,
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanMode::Easy => write!(f, "easy"),
            ScanMode::Expert => write!(f, "expert"),
        }
    }
}

/// Named commands dispatched to a device through the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceCommand {
    /// Start a scan with stored parameters.
    ScanEasy,
    /// Start a scan with the operator parameter set.
    ScanExpert,
    /// Abort an in-flight scan.
    Abort,
    /// Return the actuator to its park position.
    Park,
    /// Halt actuator motion in place.
    Stop,
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceCommand::ScanEasy => write!(f, "SCAN_EASY"),
            DeviceCommand::ScanExpert => write!(f, "SCAN_EXPERT"),
            DeviceCommand::Abort => write!(f, "ABORT"),
            DeviceCommand::Park => write!(f, "PARK"),
            DeviceCommand::Stop => write!(f, "STOP"),
        }
    }
}

/// Device fields the coordinators monitor for change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldDescriptor {
    /// Scanner fork limit switch; asserted when the fork reaches park.
    LimitSwitch,
    /// Scan sequence counter; increments when a scan pass completes.
    SequenceId,
    /// Scanner error flag; nonzero on device fault.
    ScanError,
    /// Harp raw-sample field on a representative axis.
    SampleArray,
}

impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldDescriptor::LimitSwitch => write!(f, "limit_switch"),
            FieldDescriptor::SequenceId => write!(f, "sequence_id"),
            FieldDescriptor::ScanError => write!(f, "scan_error"),
            FieldDescriptor::SampleArray => write!(f, "sample_array"),
        }
    }
}

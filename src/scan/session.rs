//! Shared session state for one data-acquisition cycle.
//!
//! A `ScanSession` holds the process-wide active flag plus the
//! scanning/unparked/completed device lists and the monitor pool. It is
//! always accessed through the coordinator's single mutex, so every
//! check-then-act on the lists happens inside one lock acquisition.

use crate::device::DeviceRef;
use crate::monitor::MonitorPool;
use uuid::Uuid;

/// Cheap snapshot of the session for UI polling.
#[derive(Debug, Clone)]
pub struct SessionStatus {
    /// Run identifier of the current or most recent session.
    pub run_id: Option<Uuid>,
    /// True while an acquisition cycle is in progress.
    pub active: bool,
    /// Devices still executing their acquisition motion.
    pub scanning: usize,
    /// Devices whose actuator has not yet returned to park.
    pub unparked: usize,
    /// Devices that finished their scanning phase this session.
    pub completed: usize,
}

/// Mutable state of one acquisition session.
pub struct ScanSession {
    run_id: Option<Uuid>,
    active: bool,
    scanning: Vec<DeviceRef>,
    unparked: Vec<DeviceRef>,
    completed: Vec<DeviceRef>,
    monitors: MonitorPool,
}

impl ScanSession {
    /// Idle session with empty lists.
    pub fn new() -> Self {
        Self {
            run_id: None,
            active: false,
            scanning: Vec::new(),
            unparked: Vec::new(),
            completed: Vec::new(),
            monitors: MonitorPool::new(),
        }
    }

    /// True while an acquisition cycle is in progress.
    pub fn active(&self) -> bool {
        self.active
    }

    /// Run identifier of the current or most recent session.
    pub fn run_id(&self) -> Option<Uuid> {
        self.run_id
    }

    /// The session's monitor pool.
    pub fn monitors(&self) -> &MonitorPool {
        &self.monitors
    }

    /// Mutable access to the monitor pool.
    pub fn monitors_mut(&mut self) -> &mut MonitorPool {
        &mut self.monitors
    }

    /// Open a new session over `devices` and return its run id.
    ///
    /// Fills `scanning` (and `unparked` when `track_park` is set, i.e. for
    /// wire scanners), clears `completed`, and raises the active flag.
    pub fn begin(&mut self, devices: &[DeviceRef], track_park: bool) -> Uuid {
        let run_id = Uuid::new_v4();
        self.run_id = Some(run_id);
        self.active = true;
        self.scanning = devices.to_vec();
        self.unparked = if track_park {
            devices.to_vec()
        } else {
            Vec::new()
        };
        self.completed.clear();
        run_id
    }

    /// Remove a device from the scanning list. Returns whether it was
    /// present; a device is removed at most once per session.
    pub fn remove_scanning(&mut self, device: &DeviceRef) -> bool {
        if let Some(pos) = self.scanning.iter().position(|d| d == device) {
            self.scanning.remove(pos);
            true
        } else {
            false
        }
    }

    /// Remove a device from the unparked list. Returns whether it was
    /// present.
    pub fn remove_unparked(&mut self, device: &DeviceRef) -> bool {
        if let Some(pos) = self.unparked.iter().position(|d| d == device) {
            self.unparked.remove(pos);
            true
        } else {
            false
        }
    }

    /// True if the device is still in its scanning phase.
    pub fn is_scanning(&self, device: &DeviceRef) -> bool {
        self.scanning.contains(device)
    }

    /// Record that a device finished its scanning phase.
    pub fn push_completed(&mut self, device: DeviceRef) {
        self.completed.push(device);
    }

    /// Devices still executing their acquisition motion.
    pub fn scanning_devices(&self) -> &[DeviceRef] {
        &self.scanning
    }

    /// Devices whose actuator has not yet returned to park.
    pub fn unparked_devices(&self) -> &[DeviceRef] {
        &self.unparked
    }

    /// Devices that finished their scanning phase this session.
    pub fn completed_devices(&self) -> &[DeviceRef] {
        &self.completed
    }

    /// Natural end of a session: clear the active flag and tear down the
    /// monitors, keeping `completed` for inspection until the next start.
    pub fn close(&mut self) {
        self.active = false;
        self.monitors.empty();
    }

    /// Forced reset: clear everything and tear down the monitors.
    pub fn terminate(&mut self) {
        self.active = false;
        self.run_id = None;
        self.scanning.clear();
        self.unparked.clear();
        self.completed.clear();
        self.monitors.empty();
    }

    /// Snapshot for UI polling.
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            run_id: self.run_id,
            active: self.active,
            scanning: self.scanning.len(),
            unparked: self.unparked.len(),
            completed: self.completed.len(),
        }
    }
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_fills_lists_and_sets_flag() {
        let mut session = ScanSession::new();
        let devices = vec![DeviceRef::scanner("WS01"), DeviceRef::scanner("WS02")];
        session.begin(&devices, true);

        assert!(session.active());
        assert!(session.run_id().is_some());
        assert_eq!(session.scanning_devices().len(), 2);
        assert_eq!(session.unparked_devices().len(), 2);
        assert!(session.completed_devices().is_empty());
    }

    #[test]
    fn harp_session_has_no_unparked_list() {
        let mut session = ScanSession::new();
        let devices = vec![DeviceRef::harp("Harp01")];
        session.begin(&devices, false);
        assert!(session.unparked_devices().is_empty());
        assert_eq!(session.scanning_devices().len(), 1);
    }

    #[test]
    fn remove_is_exactly_once() {
        let mut session = ScanSession::new();
        let ws = DeviceRef::scanner("WS01");
        session.begin(std::slice::from_ref(&ws), true);

        assert!(session.remove_scanning(&ws));
        assert!(!session.remove_scanning(&ws));
        assert!(session.remove_unparked(&ws));
        assert!(!session.remove_unparked(&ws));
    }

    #[test]
    fn close_keeps_completed_terminate_clears_it() {
        let mut session = ScanSession::new();
        let ws = DeviceRef::scanner("WS01");
        session.begin(std::slice::from_ref(&ws), true);
        session.remove_scanning(&ws);
        session.push_completed(ws.clone());

        session.close();
        assert!(!session.active());
        assert_eq!(session.completed_devices().len(), 1);

        session.terminate();
        assert!(session.completed_devices().is_empty());
        assert!(session.run_id().is_none());
    }

    #[test]
    fn begin_clears_previous_completed() {
        let mut session = ScanSession::new();
        let ws = DeviceRef::scanner("WS01");
        session.begin(std::slice::from_ref(&ws), true);
        session.push_completed(ws.clone());
        session.close();

        session.begin(std::slice::from_ref(&ws), true);
        assert!(session.completed_devices().is_empty());
    }
}

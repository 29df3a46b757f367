//! Per-device progress trackers.
//!
//! One tracker instance exists per device per session, owned by that
//! device's monitor callbacks and touched by no one else. Each tracker
//! discards the first delivery it sees: activating a monitor replays the
//! current field value as an initialization echo, which must not be
//! mistaken for a real transition.
//!
//! The scanner trackers implement the unblock handshake: the limit-switch
//! watcher stays blocked until the device reports at least one completed
//! scan sequence, so a stale park-position reading cannot be taken for
//! "parked".

/// Tracks the scan-sequence counter of one wire scanner.
///
/// The first delivery is the echo; the next delivery is the first real
/// sequence increment and marks the device's scanning phase complete.
#[derive(Debug, Default)]
pub struct SequenceAction {
    echo_seen: bool,
    completed: bool,
}

impl SequenceAction {
    /// New tracker; echo not yet consumed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe one sequence-id delivery. Returns `true` exactly once, on
    /// the first real increment.
    pub fn observe(&mut self) -> bool {
        if !self.echo_seen {
            self.echo_seen = true;
            return false;
        }
        if self.completed {
            return false;
        }
        self.completed = true;
        true
    }
}

/// Tracks the park limit switch of one wire scanner.
///
/// Starts blocked; [`LimitSwitchAction::unblock`] is called when the
/// device's sequence counter first increments. Assertions seen while
/// blocked are ignored.
#[derive(Debug)]
pub struct LimitSwitchAction {
    echo_seen: bool,
    blocked: bool,
    parked: bool,
}

impl Default for LimitSwitchAction {
    fn default() -> Self {
        Self {
            echo_seen: false,
            blocked: true,
            parked: false,
        }
    }
}

impl LimitSwitchAction {
    /// New tracker; blocked until the first sequence increment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the watcher. Called from the sequence-id callback.
    pub fn unblock(&mut self) {
        self.blocked = false;
    }

    /// Observe one limit-switch delivery. Returns `true` exactly once, on
    /// the first asserted reading after the watcher is armed.
    pub fn observe(&mut self, asserted: bool) -> bool {
        if !self.echo_seen {
            self.echo_seen = true;
            return false;
        }
        if self.blocked || self.parked || !asserted {
            return false;
        }
        self.parked = true;
        true
    }
}

/// Tracks the error flag of one device.
#[derive(Debug, Default)]
pub struct FaultAction {
    echo_seen: bool,
    tripped: bool,
}

impl FaultAction {
    /// New tracker; echo not yet consumed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe one error-field delivery. Returns `true` exactly once, on
    /// the first nonzero reading.
    pub fn observe(&mut self, asserted: bool) -> bool {
        if !self.echo_seen {
            self.echo_seen = true;
            return false;
        }
        if self.tripped || !asserted {
            return false;
        }
        self.tripped = true;
        true
    }
}

/// Progress reported by a [`SampleAction`] for one real sample delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleProgress {
    /// 1-based index of the sample just taken.
    pub index: u32,
    /// True when this was the final requested sample. The same delivery
    /// that reports the last sample also signals device completion.
    pub last: bool,
}

/// Counts harp sample deliveries toward a requested total.
#[derive(Debug)]
pub struct SampleAction {
    echo_seen: bool,
    taken: u32,
    requested: u32,
}

impl SampleAction {
    /// New tracker expecting `requested` samples.
    pub fn new(requested: u32) -> Self {
        Self {
            echo_seen: false,
            taken: 0,
            requested,
        }
    }

    /// Observe one sample-field delivery. Returns progress for real
    /// samples; `None` for the echo and for deliveries past the requested
    /// total.
    pub fn observe(&mut self) -> Option<SampleProgress> {
        if !self.echo_seen {
            self.echo_seen = true;
            return None;
        }
        if self.taken >= self.requested {
            return None;
        }
        self.taken += 1;
        Some(SampleProgress {
            index: self.taken,
            last: self.taken == self.requested,
        })
    }
}

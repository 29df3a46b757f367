//! Scan coordination: session state, listener contracts, and the
//! wire-scanner and wire-harp coordinators.

pub mod coordinator;
pub mod harp;
pub mod listener;
pub mod session;

pub use coordinator::ScanCoordinator;
pub use harp::HarpCoordinator;
pub use listener::{HarpControllerListener, ListenerSet, ScanControllerListener};
pub use session::{ScanSession, SessionStatus};

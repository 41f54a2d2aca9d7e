//! CAN Bus Layer
//!
//! Consumes a CAN controller through the [`Transceiver`] trait and provides:
//! - Frame routing into the active protocol decoder, with a diagnostic log
//! - Bus health monitoring with bus-off recovery and staleness detection
//! - A bounded per-cycle receive drain

mod health;
mod ingest;
mod router;
mod simulated;
mod transceiver;

pub use health::{BusHealth, BusState, HealthConfig, HealthError, HealthMonitor, RecoveryAttempt, Transition};
pub use ingest::{drain, DrainConfig};
pub use router::{FrameLog, FrameRouter, LoggedFrame, FRAME_LOG_CAPACITY};
pub use simulated::SimulatedTransceiver;
pub use transceiver::{BusConfig, BusStatus, ControllerState, Transceiver, TransceiverError};

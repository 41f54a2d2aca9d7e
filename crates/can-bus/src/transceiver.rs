//! Transceiver capability consumed by the bus layer

use can_protocol::{ProtocolFrame, ProtocolVariant};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors reported by a CAN transceiver driver
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransceiverError {
    /// No frame arrived within the receive timeout
    #[error("Timeout waiting for CAN frame")]
    Timeout,

    /// Driver installation rejected the configuration
    #[error("Driver install failed: {0}")]
    InstallFailed(String),

    /// Controller could not enter the running state
    #[error("Start failed: {0}")]
    StartFailed(String),

    /// Operation requires an installed driver
    #[error("Driver not installed")]
    NotInstalled,

    /// Operation requires a running controller
    #[error("Controller not running")]
    NotRunning,

    /// Any other driver-level fault
    #[error("Driver error: {0}")]
    Driver(String),
}

/// Controller state as reported by the peripheral's status register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerState {
    Stopped,
    Running,
    BusOff,
    Recovering,
}

/// Snapshot of the peripheral's status and error counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusStatus {
    pub state: ControllerState,
    pub rx_errors: u32,
    pub tx_errors: u32,
    /// Frames waiting in the receive queue
    pub queue_depth: u32,
}

/// Driver configuration passed to [`Transceiver::install`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Nominal bitrate (bit/s)
    pub bitrate: u32,
    pub tx_pin: u8,
    pub rx_pin: u8,
    /// Accept only the active protocol's identifiers
    pub filter_enabled: bool,
    /// Protocol the acceptance filter is built for, set by the owner of
    /// the runtime configuration. `None` accepts everything.
    #[serde(skip)]
    pub protocol: Option<ProtocolVariant>,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            bitrate: 1_000_000,
            tx_pin: 21,
            rx_pin: 22,
            filter_enabled: true,
            protocol: None,
        }
    }
}

impl BusConfig {
    /// Protocol whose identifiers pass the acceptance filter, if filtering
    pub fn acceptance(&self) -> Option<ProtocolVariant> {
        if self.filter_enabled {
            self.protocol
        } else {
            None
        }
    }
}

/// A CAN controller the bus layer drives.
///
/// Bit timing, arbitration, CRC and acknowledgement are the peripheral's
/// business; this trait only covers lifecycle, receive and status.
pub trait Transceiver {
    fn install(&mut self, config: &BusConfig) -> Result<(), TransceiverError>;

    fn start(&mut self) -> Result<(), TransceiverError>;

    /// Wait at most `timeout` for a frame. `Duration::ZERO` polls.
    fn receive(&mut self, timeout: Duration) -> Result<ProtocolFrame, TransceiverError>;

    fn status(&mut self) -> Result<BusStatus, TransceiverError>;

    /// Ask the peripheral to leave bus-off
    fn initiate_recovery(&mut self) -> Result<(), TransceiverError>;
}

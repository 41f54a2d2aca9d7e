//! Queue-backed transceiver for tests and demo mode

use crate::transceiver::{BusConfig, BusStatus, ControllerState, Transceiver, TransceiverError};
use can_protocol::{ProtocolFrame, ProtocolVariant};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info};

/// In-memory transceiver with injectable faults.
///
/// `receive` never sleeps: an empty queue reports `Timeout` immediately.
/// With an acceptance filter installed, frames the protocol does not
/// recognise are dropped on receive and never reach the caller.
#[derive(Debug)]
pub struct SimulatedTransceiver {
    inbox: VecDeque<ProtocolFrame>,
    installed: bool,
    acceptance: Option<ProtocolVariant>,
    filtered: u32,
    state: ControllerState,
    rx_errors: u32,
    tx_errors: u32,
    fail_install: bool,
    fail_start: bool,
    fail_status: bool,
    fail_recovery: bool,
    recovery_requests: u32,
    receive_calls: u32,
    last_timeout: Option<Duration>,
}

impl Default for SimulatedTransceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedTransceiver {
    pub fn new() -> Self {
        Self {
            inbox: VecDeque::new(),
            installed: false,
            acceptance: None,
            filtered: 0,
            state: ControllerState::Stopped,
            rx_errors: 0,
            tx_errors: 0,
            fail_install: false,
            fail_start: false,
            fail_status: false,
            fail_recovery: false,
            recovery_requests: 0,
            receive_calls: 0,
            last_timeout: None,
        }
    }

    /// Queue a frame for a later `receive`
    pub fn enqueue(&mut self, frame: ProtocolFrame) {
        self.inbox.push_back(frame);
    }

    pub fn enqueue_all(&mut self, frames: impl IntoIterator<Item = ProtocolFrame>) {
        self.inbox.extend(frames);
    }

    pub fn pending(&self) -> usize {
        self.inbox.len()
    }

    /// Force the controller state, e.g. to simulate bus-off
    pub fn set_controller_state(&mut self, state: ControllerState) {
        debug!("Simulated controller state -> {:?}", state);
        if state == ControllerState::BusOff {
            self.tx_errors = 256;
        } else if state == ControllerState::Running {
            self.tx_errors = 0;
        }
        self.state = state;
    }

    pub fn controller_state(&self) -> ControllerState {
        self.state
    }

    pub fn fail_install(&mut self, fail: bool) {
        self.fail_install = fail;
    }

    pub fn fail_start(&mut self, fail: bool) {
        self.fail_start = fail;
    }

    pub fn fail_status(&mut self, fail: bool) {
        self.fail_status = fail;
    }

    pub fn fail_recovery(&mut self, fail: bool) {
        self.fail_recovery = fail;
    }

    /// Number of recovery requests issued
    pub fn recovery_requests(&self) -> u32 {
        self.recovery_requests
    }

    /// Frames dropped by the acceptance filter
    pub fn filtered(&self) -> u32 {
        self.filtered
    }

    /// Number of `receive` calls made
    pub fn receive_calls(&self) -> u32 {
        self.receive_calls
    }

    /// Timeout passed to the most recent `receive`
    pub fn last_timeout(&self) -> Option<Duration> {
        self.last_timeout
    }
}

impl Transceiver for SimulatedTransceiver {
    fn install(&mut self, config: &BusConfig) -> Result<(), TransceiverError> {
        if self.fail_install {
            return Err(TransceiverError::InstallFailed("simulated install fault".into()));
        }
        info!("Simulated transceiver installed at {} bit/s", config.bitrate);
        self.acceptance = config.acceptance();
        if let Some(protocol) = self.acceptance {
            info!("Acceptance filter: {} identifiers only", protocol);
        }
        self.installed = true;
        Ok(())
    }

    fn start(&mut self) -> Result<(), TransceiverError> {
        if !self.installed {
            return Err(TransceiverError::NotInstalled);
        }
        if self.fail_start {
            return Err(TransceiverError::StartFailed("simulated start fault".into()));
        }
        self.state = ControllerState::Running;
        Ok(())
    }

    fn receive(&mut self, timeout: Duration) -> Result<ProtocolFrame, TransceiverError> {
        self.receive_calls += 1;
        self.last_timeout = Some(timeout);
        if self.state != ControllerState::Running {
            return Err(TransceiverError::NotRunning);
        }
        let filter = self.acceptance.map(ProtocolVariant::decoder);
        while let Some(frame) = self.inbox.pop_front() {
            if let Some(decoder) = &filter {
                if !decoder.recognizes(frame.raw_id()) {
                    self.filtered += 1;
                    continue;
                }
            }
            self.rx_errors = self.rx_errors.saturating_sub(1);
            return Ok(frame);
        }
        Err(TransceiverError::Timeout)
    }

    fn status(&mut self) -> Result<BusStatus, TransceiverError> {
        if self.fail_status {
            return Err(TransceiverError::Driver("simulated status fault".into()));
        }
        if !self.installed {
            return Err(TransceiverError::NotInstalled);
        }
        Ok(BusStatus {
            state: self.state,
            rx_errors: self.rx_errors,
            tx_errors: self.tx_errors,
            queue_depth: self.inbox.len() as u32,
        })
    }

    fn initiate_recovery(&mut self) -> Result<(), TransceiverError> {
        self.recovery_requests += 1;
        if self.fail_recovery {
            return Err(TransceiverError::Driver("simulated recovery fault".into()));
        }
        if self.state != ControllerState::BusOff {
            return Err(TransceiverError::Driver("controller not in bus-off".into()));
        }
        self.state = ControllerState::Recovering;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receive_requires_running() {
        let mut sim = SimulatedTransceiver::new();
        sim.enqueue(ProtocolFrame::standard(0x100, &[1]).unwrap());
        assert_eq!(sim.receive(Duration::ZERO), Err(TransceiverError::NotRunning));

        sim.install(&BusConfig::default()).unwrap();
        sim.start().unwrap();
        assert!(sim.receive(Duration::ZERO).is_ok());
        assert_eq!(sim.receive(Duration::ZERO), Err(TransceiverError::Timeout));
    }

    #[test]
    fn test_acceptance_filter_drops_foreign_ids() {
        let mut sim = SimulatedTransceiver::new();
        sim.install(&BusConfig {
            protocol: Some(ProtocolVariant::Custom),
            ..BusConfig::default()
        })
        .unwrap();
        sim.start().unwrap();
        sim.enqueue_all([
            ProtocolFrame::standard(0x5F0, &[1]).unwrap(),
            ProtocolFrame::standard(0x7FF, &[]).unwrap(),
            ProtocolFrame::standard(0x101, &[2]).unwrap(),
        ]);

        assert_eq!(sim.receive(Duration::ZERO).unwrap().raw_id(), 0x101);
        assert_eq!(sim.filtered(), 2);
        assert_eq!(sim.receive(Duration::ZERO), Err(TransceiverError::Timeout));
    }

    #[test]
    fn test_filter_disabled_accepts_everything() {
        let mut sim = SimulatedTransceiver::new();
        sim.install(&BusConfig {
            filter_enabled: false,
            protocol: Some(ProtocolVariant::Custom),
            ..BusConfig::default()
        })
        .unwrap();
        sim.start().unwrap();
        sim.enqueue(ProtocolFrame::standard(0x5F0, &[1]).unwrap());

        assert_eq!(sim.receive(Duration::ZERO).unwrap().raw_id(), 0x5F0);
        assert_eq!(sim.filtered(), 0);
    }

    #[test]
    fn test_start_before_install() {
        let mut sim = SimulatedTransceiver::new();
        assert_eq!(sim.start(), Err(TransceiverError::NotInstalled));
    }

    #[test]
    fn test_recovery_only_from_bus_off() {
        let mut sim = SimulatedTransceiver::new();
        sim.install(&BusConfig::default()).unwrap();
        sim.start().unwrap();
        assert!(sim.initiate_recovery().is_err());
        sim.set_controller_state(ControllerState::BusOff);
        sim.initiate_recovery().unwrap();
        assert_eq!(sim.controller_state(), ControllerState::Recovering);
        assert_eq!(sim.recovery_requests(), 2);
    }
}

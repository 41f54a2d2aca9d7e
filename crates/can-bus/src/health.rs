//! Bus Health Monitor & Recovery
//!
//! Tracks the transceiver lifecycle (Stopped, Running, BusOff, Recovering,
//! Failed), polls the controller status at a fixed interval, drives bus-off
//! recovery under a cooldown and owns the last-frame liveness timestamp used
//! for staleness detection.
//!
//! All timing is expressed in milliseconds supplied by the caller so the
//! state machine stays deterministic under test.

use crate::transceiver::{BusConfig, ControllerState, Transceiver};
use metrics::counter;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

const BUS_OFF_MESSAGE: &str = "CAN bus in BUS-OFF. Check wiring and termination.";
const RECOVERING_MESSAGE: &str = "CAN bus recovery in progress...";

/// Lifecycle state of the CAN bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusState {
    Stopped,
    Running,
    BusOff,
    Recovering,
    /// Install or start failed; no automatic retry
    Failed,
}

impl BusState {
    /// States rendered as a full-strip fault
    pub fn is_fault(self) -> bool {
        matches!(self, BusState::BusOff | BusState::Recovering | BusState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BusState::Stopped => "stopped",
            BusState::Running => "running",
            BusState::BusOff => "bus_off",
            BusState::Recovering => "recovering",
            BusState::Failed => "failed",
        }
    }
}

/// Published bus health
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusHealth {
    pub state: BusState,
    /// Human-readable reason, empty while healthy
    pub message: String,
    pub last_frame_ms: Option<u64>,
}

/// Timing parameters of the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Minimum time between controller status reads
    pub check_interval_ms: u64,
    /// Minimum time between recovery attempts
    pub recovery_cooldown_ms: u64,
    /// Silence after which a running bus counts as stale
    pub stale_after_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: 5000,
            recovery_cooldown_ms: 10000,
            stale_after_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HealthError {
    #[error("Bus already started (state: {0:?})")]
    AlreadyStarted(BusState),
}

/// Outcome of a recovery request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAttempt {
    /// Recovery was requested from the controller
    Initiated,
    /// Still inside the cooldown of the previous attempt
    Suppressed,
    /// The controller rejected the request
    Failed,
}

/// A state change observed by [`HealthMonitor::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: BusState,
    pub to: BusState,
}

/// Bus lifecycle state machine
#[derive(Debug, Clone)]
pub struct HealthMonitor {
    config: HealthConfig,
    state: BusState,
    message: String,
    last_check_ms: u64,
    last_recovery_ms: Option<u64>,
    /// Liveness reference: start, recovery or last frame time
    liveness_ms: u64,
    last_frame_ms: Option<u64>,
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new(HealthConfig::default())
    }
}

impl HealthMonitor {
    pub fn new(config: HealthConfig) -> Self {
        Self {
            config,
            state: BusState::Stopped,
            message: String::new(),
            last_check_ms: 0,
            last_recovery_ms: None,
            liveness_ms: 0,
            last_frame_ms: None,
        }
    }

    /// Install and start the transceiver. Only valid from `Stopped`.
    ///
    /// Install or start failures move the monitor to `Failed`, which is
    /// reported through the state rather than the return value.
    pub fn start<T: Transceiver + ?Sized>(
        &mut self,
        transceiver: &mut T,
        bus: &BusConfig,
        now_ms: u64,
    ) -> Result<BusState, HealthError> {
        if self.state != BusState::Stopped {
            return Err(HealthError::AlreadyStarted(self.state));
        }

        info!(
            "Starting CAN bus at {} bit/s (tx {}, rx {})",
            bus.bitrate, bus.tx_pin, bus.rx_pin
        );

        if let Err(e) = transceiver.install(bus) {
            error!("CAN driver install failed: {}", e);
            self.fail(format!("Driver install failed ({}). Check GPIO pins.", e));
            return Ok(self.state);
        }
        if let Err(e) = transceiver.start() {
            error!("CAN start failed: {}", e);
            self.fail(format!(
                "Failed to start CAN bus ({}). Check wiring and termination.",
                e
            ));
            return Ok(self.state);
        }

        self.state = BusState::Running;
        self.message.clear();
        self.last_check_ms = now_ms;
        self.liveness_ms = now_ms;
        info!("CAN bus running");
        Ok(self.state)
    }

    fn fail(&mut self, message: String) {
        self.state = BusState::Failed;
        self.message = message;
    }

    /// Rate-limited status check. Returns the transition taken, if any.
    pub fn poll<T: Transceiver + ?Sized>(
        &mut self,
        transceiver: &mut T,
        now_ms: u64,
    ) -> Option<Transition> {
        if matches!(self.state, BusState::Stopped | BusState::Failed) {
            return None;
        }
        if now_ms.saturating_sub(self.last_check_ms) < self.config.check_interval_ms {
            return None;
        }
        self.last_check_ms = now_ms;

        let status = match transceiver.status() {
            Ok(status) => status,
            Err(e) => {
                warn!("CAN status read failed: {}", e);
                return None;
            }
        };
        debug!(
            "CAN status {:?} (rx errors {}, tx errors {}, queued {})",
            status.state, status.rx_errors, status.tx_errors, status.queue_depth
        );

        let from = self.state;
        match (from, status.state) {
            (BusState::Running, ControllerState::BusOff) => {
                warn!(
                    "CAN bus-off detected (tx errors {})",
                    status.tx_errors
                );
                counter!("canled_bus_off_total").increment(1);
                self.state = BusState::BusOff;
                self.message = BUS_OFF_MESSAGE.to_string();
                self.attempt_recovery(transceiver, now_ms);
            }
            // Still bus-off: a previous request did not take, retry after the cooldown
            (BusState::BusOff | BusState::Recovering, ControllerState::BusOff) => {
                self.attempt_recovery(transceiver, now_ms);
            }
            (BusState::BusOff | BusState::Recovering, ControllerState::Stopped) => {
                // Recovery completed; the controller needs restarting
                match transceiver.start() {
                    Ok(()) => self.recovered(now_ms),
                    Err(e) => {
                        warn!("CAN restart after recovery failed: {}", e);
                        self.state = BusState::Recovering;
                        self.message = RECOVERING_MESSAGE.to_string();
                    }
                }
            }
            (BusState::BusOff | BusState::Recovering, ControllerState::Running) => {
                self.recovered(now_ms);
            }
            _ => {}
        }

        (self.state != from).then_some(Transition {
            from,
            to: self.state,
        })
    }

    fn recovered(&mut self, now_ms: u64) {
        info!("CAN bus recovered");
        self.state = BusState::Running;
        self.message.clear();
        self.liveness_ms = now_ms;
    }

    /// Request bus-off recovery, honouring the cooldown
    pub fn attempt_recovery<T: Transceiver + ?Sized>(
        &mut self,
        transceiver: &mut T,
        now_ms: u64,
    ) -> RecoveryAttempt {
        if let Some(last) = self.last_recovery_ms {
            if now_ms.saturating_sub(last) < self.config.recovery_cooldown_ms {
                debug!("Recovery suppressed, cooldown active");
                return RecoveryAttempt::Suppressed;
            }
        }
        self.last_recovery_ms = Some(now_ms);
        counter!("canled_recovery_attempts_total").increment(1);

        match transceiver.initiate_recovery() {
            Ok(()) => {
                info!("CAN bus recovery initiated");
                self.state = BusState::Recovering;
                self.message = RECOVERING_MESSAGE.to_string();
                RecoveryAttempt::Initiated
            }
            Err(e) => {
                warn!("CAN recovery request failed: {}", e);
                RecoveryAttempt::Failed
            }
        }
    }

    /// Record a received frame
    pub fn note_frame(&mut self, now_ms: u64) {
        self.last_frame_ms = Some(now_ms);
        self.liveness_ms = now_ms;
    }

    /// Running but silent for longer than the stale threshold
    pub fn is_stale(&self, now_ms: u64) -> bool {
        self.state == BusState::Running
            && now_ms.saturating_sub(self.liveness_ms) > self.config.stale_after_ms
    }

    pub fn state(&self) -> BusState {
        self.state
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn last_frame_ms(&self) -> Option<u64> {
        self.last_frame_ms
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    pub fn health(&self) -> BusHealth {
        BusHealth {
            state: self.state,
            message: self.message.clone(),
            last_frame_ms: self.last_frame_ms,
        }
    }
}

//! Demo mode: a simulated drive encoded as real protocol frames
//!
//! The scenario ramps throttle up and down, lets RPM follow with smoothing,
//! warms the coolant and derives oil pressure from RPM. Each step is encoded
//! with the active protocol's encoder and queued on a simulated transceiver,
//! so demo data flows through the same router and decoder as live data.

use can_bus::{BusConfig, BusStatus, SimulatedTransceiver, Transceiver, TransceiverError};
use can_protocol::{FrameDecoder, ProtocolFrame, ProtocolVariant};
use std::time::{Duration, Instant};
use tracing::info;
use vehicle_state::{Percent, VehicleState};

/// Scenario update period (20 Hz)
pub const DEMO_STEP_MS: u64 = 50;
/// Throttle change per step while accelerating (%)
const ACCEL_RATE: f32 = 2.0;
/// Fraction of the RPM error closed per step
const RPM_SMOOTHING: f32 = 0.05;
const IDLE_RPM: f32 = 1000.0;
const WARM_COOLANT: f32 = 850.0;

/// Deterministic driving scenario
#[derive(Debug, Clone)]
pub struct DemoScenario {
    throttle: f32,
    rpm: f32,
    accelerating: bool,
    coolant: f32,
    redline: u16,
    last_step_ms: Option<u64>,
    state: VehicleState,
}

impl DemoScenario {
    pub fn new(redline: u16) -> Self {
        Self {
            throttle: 0.0,
            rpm: IDLE_RPM,
            accelerating: true,
            coolant: 600.0,
            redline,
            last_step_ms: None,
            state: VehicleState::default(),
        }
    }

    /// Advance one step if a step period has passed.
    ///
    /// Returns the new state when a step was taken.
    pub fn step(&mut self, now_ms: u64) -> Option<&VehicleState> {
        if let Some(last) = self.last_step_ms {
            if now_ms.saturating_sub(last) < DEMO_STEP_MS {
                return None;
            }
        }
        self.last_step_ms = Some(now_ms);

        if self.accelerating {
            self.throttle += ACCEL_RATE;
            if self.throttle >= 100.0 {
                self.throttle = 100.0;
                self.accelerating = false;
            }
        } else {
            self.throttle -= ACCEL_RATE * 1.5;
            if self.throttle <= 0.0 {
                self.throttle = 0.0;
                self.accelerating = true;
            }
        }

        let redline = self.redline as f32;
        let target = IDLE_RPM + (self.throttle / 100.0) * (redline - IDLE_RPM);
        self.rpm += (target - self.rpm) * RPM_SMOOTHING;

        if self.coolant < WARM_COOLANT {
            self.coolant += 0.5;
        }

        let state = &mut self.state;
        state.throttle = Percent::saturating(self.throttle as u32);
        state.set_rpm(self.rpm as u16);
        state.ignition_on = true;
        state.brake = if self.accelerating {
            Percent::ZERO
        } else {
            Percent::saturating((100.0 - self.throttle) as u32)
        };
        state.coolant_temp = self.coolant as u16;
        state.oil_pressure = 35 + state.rpm / 200;
        state.rev_limiter = state.rpm >= self.redline.saturating_sub(100);

        Some(&self.state)
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }
}

/// Transceiver that feeds a [`DemoScenario`] through the protocol encoder
pub struct DemoTransceiver {
    inner: SimulatedTransceiver,
    scenario: DemoScenario,
    encoder: Box<dyn FrameDecoder>,
    epoch: Instant,
}

impl DemoTransceiver {
    pub fn new(variant: ProtocolVariant, redline: u16) -> Self {
        info!("Demo mode: simulating {} frames", variant);
        Self {
            inner: SimulatedTransceiver::new(),
            scenario: DemoScenario::new(redline),
            encoder: variant.decoder(),
            epoch: Instant::now(),
        }
    }

    /// Frames for the scenario step due at `now_ms`, if any
    pub fn frames_at(&mut self, now_ms: u64) -> Vec<ProtocolFrame> {
        match self.scenario.step(now_ms) {
            Some(state) => self.encoder.encode(state),
            None => Vec::new(),
        }
    }

    pub fn scenario(&self) -> &DemoScenario {
        &self.scenario
    }
}

impl Transceiver for DemoTransceiver {
    fn install(&mut self, config: &BusConfig) -> Result<(), TransceiverError> {
        self.inner.install(config)
    }

    fn start(&mut self) -> Result<(), TransceiverError> {
        self.inner.start()
    }

    fn receive(&mut self, timeout: Duration) -> Result<ProtocolFrame, TransceiverError> {
        if self.inner.pending() == 0 {
            let now_ms = self.epoch.elapsed().as_millis() as u64;
            let frames = self.frames_at(now_ms);
            self.inner.enqueue_all(frames);
        }
        self.inner.receive(timeout)
    }

    fn status(&mut self) -> Result<BusStatus, TransceiverError> {
        self.inner.status()
    }

    fn initiate_recovery(&mut self) -> Result<(), TransceiverError> {
        self.inner.initiate_recovery()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_rate_limited() {
        let mut scenario = DemoScenario::new(6500);
        assert!(scenario.step(0).is_some());
        assert!(scenario.step(49).is_none());
        assert!(scenario.step(50).is_some());
    }

    #[test]
    fn test_scenario_ramps_and_warms() {
        let mut scenario = DemoScenario::new(6500);
        let mut peak_rpm = 0;
        let mut saw_brake = false;
        for i in 0..400u64 {
            if let Some(state) = scenario.step(i * DEMO_STEP_MS) {
                assert!(state.throttle.get() <= 100);
                assert!(state.ignition_on);
                peak_rpm = peak_rpm.max(state.rpm);
                saw_brake |= !state.brake.is_zero();
                assert_eq!(state.oil_pressure, 35 + state.rpm / 200);
            }
        }
        assert!(peak_rpm > 3000);
        assert!(saw_brake);
        assert_eq!(scenario.state().coolant_temp, 800);
    }

    #[test]
    fn test_frames_decode_back() {
        for variant in ProtocolVariant::ALL {
            let mut demo = DemoTransceiver::new(variant, 6500);
            let mut frames = Vec::new();
            for i in 0..30u64 {
                frames = demo.frames_at(i * DEMO_STEP_MS);
            }
            let expected = demo.scenario().state().clone();

            let decoder = variant.decoder();
            let mut decoded = VehicleState::default();
            for frame in &frames {
                decoder.decode(frame, &mut decoded);
            }
            assert_eq!(decoded.rpm, expected.rpm, "{}", variant);
            assert_eq!(decoded.throttle, expected.throttle, "{}", variant);
            assert_eq!(decoded.coolant_temp, expected.coolant_temp, "{}", variant);
            assert_eq!(decoded.oil_pressure, expected.oil_pressure, "{}", variant);
            assert_eq!(decoded.engine_running, expected.engine_running, "{}", variant);
        }
    }

    #[test]
    fn test_demo_transceiver_delivers_frames() {
        let mut demo = DemoTransceiver::new(ProtocolVariant::Custom, 6500);
        demo.install(&BusConfig::default()).unwrap();
        demo.start().unwrap();
        let frame = demo.receive(Duration::ZERO).unwrap();
        assert_eq!(frame.raw_id(), 0x100);
    }
}

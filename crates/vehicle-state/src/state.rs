//! Canonical vehicle state record

use crate::Percent;
use serde::{Deserialize, Serialize};

/// RPM above which the engine counts as running
pub const ENGINE_RUNNING_RPM: u16 = 300;

/// Snapshot of the monitored vehicle.
///
/// All quantities are fixed-point integers. A field not yet reported by the
/// active protocol keeps the default below until a frame carries it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleState {
    /// Engine speed (RPM)
    pub rpm: u16,
    /// Throttle position
    pub throttle: Percent,
    /// Brake pedal position
    pub brake: Percent,
    /// Clutch pedal position
    pub clutch: Percent,
    /// Handbrake lever position
    pub handbrake: Percent,
    /// Coolant temperature (°C * 10)
    pub coolant_temp: u16,
    /// Intake air temperature (°C * 10)
    pub air_temp: u16,
    /// Oil pressure (bar * 10)
    pub oil_pressure: u16,
    /// Fuel pressure (bar * 10)
    pub fuel_pressure: u16,
    /// Battery voltage (V * 100)
    pub battery_voltage: u16,
    /// Ignition timing (degrees * 10, signed)
    pub ignition_timing: i16,
    /// Lambda (* 100)
    pub lambda: u16,
    /// Road speed (km/h * 10)
    pub vehicle_speed: u16,
    /// Gear index, 0 = neutral
    pub gear: u8,
    pub ignition_on: bool,
    /// Derived from `rpm` only, see [`VehicleState::set_rpm`]
    pub engine_running: bool,
    pub rev_limiter: bool,
    pub anti_lag: bool,
    pub launch_control: bool,
    pub flat_shift: bool,
}

impl Default for VehicleState {
    fn default() -> Self {
        Self {
            rpm: 0,
            throttle: Percent::ZERO,
            brake: Percent::ZERO,
            clutch: Percent::ZERO,
            handbrake: Percent::ZERO,
            coolant_temp: 600,
            air_temp: 250,
            oil_pressure: 30,
            fuel_pressure: 300,
            battery_voltage: 1400,
            ignition_timing: 150,
            lambda: 100,
            vehicle_speed: 0,
            gear: 0,
            ignition_on: false,
            engine_running: false,
            rev_limiter: false,
            anti_lag: false,
            launch_control: false,
            flat_shift: false,
        }
    }
}

impl VehicleState {
    /// Update engine speed and the engine-running flag together.
    ///
    /// This is the only place `engine_running` is derived; ignition is a
    /// separate signal.
    pub fn set_rpm(&mut self, rpm: u16) {
        self.rpm = rpm;
        self.engine_running = rpm > ENGINE_RUNNING_RPM;
    }

    /// Coolant temperature in whole degrees, truncated
    pub fn coolant_celsius(&self) -> u16 {
        self.coolant_temp / 10
    }
}

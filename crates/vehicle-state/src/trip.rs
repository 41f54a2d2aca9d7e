//! Trip statistics aggregated once per control cycle

use crate::VehicleState;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Brake position above which a sample counts as hard braking
const HARD_BRAKING_PERCENT: u8 = 80;

/// Sentinel for "no oil pressure sample yet"
const NO_OIL_SAMPLE: u16 = 9999;

/// Running aggregates over the current trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripStatistics {
    pub max_rpm: u16,
    /// Whole degrees
    pub max_coolant_temp: u16,
    /// bar * 10
    pub min_oil_pressure: u16,
    /// Samples taken while the limiter was active
    pub rev_limiter_hits: u32,
    pub hard_braking_events: u32,
    pub trip_start_ms: u64,
    /// Accumulated while the engine was running
    pub running_time_ms: u64,
    rpm_sum: u64,
    rpm_samples: u32,
    #[serde(skip)]
    last_update_ms: Option<u64>,
}

impl Default for TripStatistics {
    fn default() -> Self {
        Self::new(0)
    }
}

impl TripStatistics {
    pub fn new(now_ms: u64) -> Self {
        Self {
            max_rpm: 0,
            max_coolant_temp: 0,
            min_oil_pressure: NO_OIL_SAMPLE,
            rev_limiter_hits: 0,
            hard_braking_events: 0,
            trip_start_ms: now_ms,
            running_time_ms: 0,
            rpm_sum: 0,
            rpm_samples: 0,
            last_update_ms: None,
        }
    }

    /// Start a new trip
    pub fn reset(&mut self, now_ms: u64) {
        info!("Trip statistics reset");
        *self = Self::new(now_ms);
    }

    /// Fold one state sample into the aggregates
    pub fn update(&mut self, state: &VehicleState, now_ms: u64) {
        self.max_rpm = self.max_rpm.max(state.rpm);
        self.max_coolant_temp = self.max_coolant_temp.max(state.coolant_celsius());
        self.min_oil_pressure = self.min_oil_pressure.min(state.oil_pressure);

        if state.rev_limiter {
            self.rev_limiter_hits += 1;
        }
        if state.brake.get() > HARD_BRAKING_PERCENT {
            self.hard_braking_events += 1;
        }

        if state.engine_running {
            self.rpm_sum += state.rpm as u64;
            self.rpm_samples += 1;
            if let Some(last) = self.last_update_ms {
                self.running_time_ms += now_ms.saturating_sub(last);
            }
        }
        self.last_update_ms = Some(now_ms);
    }

    /// Mean RPM over engine-running samples (0 if none)
    pub fn average_rpm(&self) -> u16 {
        if self.rpm_samples == 0 {
            0
        } else {
            (self.rpm_sum / self.rpm_samples as u64) as u16
        }
    }
}

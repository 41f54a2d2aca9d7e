//! Published state shared with readers outside the control loop

use crate::config::RuntimeConfig;
use can_bus::{BusHealth, BusState, LoggedFrame};
use can_protocol::units::{format_hundredths, format_signed_tenths, format_tenths};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use vehicle_state::{TripStatistics, VehicleState};

/// One logged frame in wire-neutral form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameView {
    pub timestamp_ms: u64,
    pub id: u32,
    pub extended: bool,
    pub len: usize,
    pub data: Vec<u8>,
    /// `ID 0x... DLCn DATA ..`
    pub text: String,
}

impl From<&LoggedFrame> for FrameView {
    fn from(logged: &LoggedFrame) -> Self {
        let frame = &logged.frame;
        Self {
            timestamp_ms: logged.timestamp_ms,
            id: frame.raw_id(),
            extended: frame.id().is_extended(),
            len: frame.len(),
            data: frame.data().to_vec(),
            text: frame.to_string(),
        }
    }
}

/// Fixed-point readings rendered in engineering units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Readings {
    pub coolant_c: String,
    pub air_temp_c: String,
    pub oil_pressure_bar: String,
    pub fuel_pressure_bar: String,
    pub battery_v: String,
    pub ignition_timing_deg: String,
    pub lambda: String,
    pub speed_kmh: String,
}

impl From<&VehicleState> for Readings {
    fn from(state: &VehicleState) -> Self {
        Self {
            coolant_c: format_tenths(state.coolant_temp),
            air_temp_c: format_tenths(state.air_temp),
            oil_pressure_bar: format_tenths(state.oil_pressure),
            fuel_pressure_bar: format_tenths(state.fuel_pressure),
            battery_v: format_hundredths(state.battery_voltage),
            ignition_timing_deg: format_signed_tenths(state.ignition_timing),
            lambda: format_hundredths(state.lambda),
            speed_kmh: format_tenths(state.vehicle_speed),
        }
    }
}

/// Everything external readers may see, copied out once per publish
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub state: VehicleState,
    pub readings: Readings,
    pub health: BusHealth,
    pub stale: bool,
    pub trip: TripStatistics,
    pub average_rpm: u16,
    /// Most recent first
    pub frames: Vec<FrameView>,
    pub frames_total: u64,
    pub frames_unrecognized: u64,
    pub active_modes: Vec<String>,
    pub config: RuntimeConfig,
    pub brightness: u8,
    pub uptime_ms: u64,
}

impl Default for Snapshot {
    fn default() -> Self {
        let state = VehicleState::default();
        Self {
            readings: Readings::from(&state),
            state,
            health: BusHealth {
                state: BusState::Stopped,
                message: String::new(),
                last_frame_ms: None,
            },
            stale: false,
            trip: TripStatistics::default(),
            average_rpm: 0,
            frames: Vec::new(),
            frames_total: 0,
            frames_unrecognized: 0,
            active_modes: Vec::new(),
            config: RuntimeConfig::default(),
            brightness: RuntimeConfig::default().brightness,
            uptime_ms: 0,
        }
    }
}

/// Shared handle to the latest snapshot.
///
/// The control loop is the only writer. Readers clone under a short read
/// lock and never block the loop for longer than that copy.
#[derive(Debug, Clone, Default)]
pub struct SnapshotHandle {
    inner: Arc<RwLock<Snapshot>>,
}

impl SnapshotHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, snapshot: Snapshot) {
        // A poisoned lock still holds a complete snapshot
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = snapshot;
    }

    pub fn read(&self) -> Snapshot {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Apply `f` to the current snapshot without cloning all of it
    pub fn with<R>(&self, f: impl FnOnce(&Snapshot) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        f(&guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use can_protocol::ProtocolFrame;

    #[test]
    fn test_publish_and_read() {
        let handle = SnapshotHandle::new();
        let reader = handle.clone();
        let mut snapshot = Snapshot::default();
        snapshot.uptime_ms = 42;
        handle.publish(snapshot);
        assert_eq!(reader.read().uptime_ms, 42);
        assert_eq!(reader.with(|s| s.health.state), BusState::Stopped);
    }

    #[test]
    fn test_frame_view() {
        let logged = LoggedFrame {
            timestamp_ms: 7,
            frame: ProtocolFrame::extended(0x2000, &[0xE8, 0x03]).unwrap(),
        };
        let view = FrameView::from(&logged);
        assert_eq!(view.id, 0x2000);
        assert!(view.extended);
        assert_eq!(view.data, vec![0xE8, 0x03]);
        assert_eq!(view.text, "ID 0x2000 DLC2 DATA E8 03");
    }

    #[test]
    fn test_readings_format() {
        let readings = Readings::from(&VehicleState::default());
        assert_eq!(readings.coolant_c, "60.0");
        assert_eq!(readings.battery_v, "14.00");
        assert_eq!(readings.ignition_timing_deg, "15.0");
        assert_eq!(readings.lambda, "1.00");
    }

    #[test]
    fn test_snapshot_serializes() {
        let json = serde_json::to_value(Snapshot::default()).unwrap();
        assert_eq!(json["health"]["state"], "stopped");
        assert_eq!(json["config"]["rpm_redline"], 6500);
    }
}

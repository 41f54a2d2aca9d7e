//! Live Vehicle State Routes

use axum::{extract::State, Json};
use serde::Serialize;
use vehicle_state::VehicleState;

use crate::SharedState;
use controller::Readings;

/// Response for the live state endpoint
#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub uptime_ms: u64,
    /// Raw fixed-point values
    pub state: VehicleState,
    /// The same values in engineering units
    pub readings: Readings,
    pub stale: bool,
    pub active_modes: Vec<String>,
    pub brightness: u8,
}

/// Get the latest decoded vehicle state
pub async fn get_state(State(state): State<SharedState>) -> Json<StateResponse> {
    let response = state.snapshot.with(|s| StateResponse {
        uptime_ms: s.uptime_ms,
        state: s.state.clone(),
        readings: s.readings.clone(),
        stale: s.stale,
        active_modes: s.active_modes.clone(),
        brightness: s.brightness,
    });
    Json(response)
}

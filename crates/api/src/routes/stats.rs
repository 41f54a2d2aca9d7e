//! Trip Statistics Routes

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::info;
use vehicle_state::TripStatistics;

use crate::{ApiError, SharedState};
use controller::ControlCommand;

/// Response for the statistics endpoint
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub trip: TripStatistics,
    pub average_rpm: u16,
    pub frames_total: u64,
    pub frames_unrecognized: u64,
    pub uptime_ms: u64,
}

/// Get trip and frame statistics
pub async fn get_stats(State(state): State<SharedState>) -> Json<StatsResponse> {
    let response = state.snapshot.with(|s| StatsResponse {
        trip: s.trip.clone(),
        average_rpm: s.average_rpm,
        frames_total: s.frames_total,
        frames_unrecognized: s.frames_unrecognized,
        uptime_ms: s.uptime_ms,
    });
    Json(response)
}

/// Start a new trip; takes effect on the next control cycle
pub async fn reset_stats(State(state): State<SharedState>) -> Result<StatusCode, ApiError> {
    state.send(ControlCommand::ResetTrip).await?;
    info!("Trip statistics reset requested");
    Ok(StatusCode::ACCEPTED)
}

//! Runtime Configuration Routes

use axum::{extract::State, http::StatusCode, Json};
use tracing::info;

use crate::{ApiError, SharedState};
use controller::{ConfigUpdate, ControlCommand, RuntimeConfig};

/// Get the configuration the control loop is running with
pub async fn get_config(State(state): State<SharedState>) -> Json<RuntimeConfig> {
    Json(state.snapshot.with(|s| s.config))
}

/// Validate a partial update against the current configuration and queue it.
///
/// Returns the configuration as it will be once the loop applies the update.
pub async fn update_config(
    State(state): State<SharedState>,
    Json(update): Json<ConfigUpdate>,
) -> Result<(StatusCode, Json<RuntimeConfig>), ApiError> {
    let current = state.snapshot.with(|s| s.config);
    let next = update.apply_to(&current)?;
    if update.is_empty() {
        return Ok((StatusCode::OK, Json(next)));
    }

    state.send(ControlCommand::UpdateConfig(update)).await?;
    info!(
        "Configuration update queued: redline {} RPM, shift {} RPM, brightness {}",
        next.rpm_redline, next.shift_light_rpm, next.brightness
    );
    Ok((StatusCode::ACCEPTED, Json(next)))
}

//! Frame Log Routes

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::SharedState;
use controller::FrameView;

/// Query parameters for the frames endpoint
#[derive(Debug, Deserialize)]
pub struct FrameQuery {
    /// Maximum number of records, most recent first
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

/// Response for the frames endpoint
#[derive(Debug, Serialize)]
pub struct FrameResponse {
    pub data: Vec<FrameView>,
    pub count: usize,
    /// Frames routed since start
    pub total: u64,
}

/// Get the most recent received frames
pub async fn get_frames(
    State(state): State<SharedState>,
    Query(params): Query<FrameQuery>,
) -> Json<FrameResponse> {
    let response = state.snapshot.with(|s| {
        let data: Vec<FrameView> = s.frames.iter().take(params.limit).cloned().collect();
        FrameResponse {
            count: data.len(),
            data,
            total: s.frames_total,
        }
    });
    Json(response)
}

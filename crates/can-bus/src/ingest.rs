//! Bounded per-cycle frame drain

use crate::health::{BusState, HealthMonitor};
use crate::router::FrameRouter;
use crate::transceiver::{Transceiver, TransceiverError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;
use vehicle_state::VehicleState;

/// Limits on how much work one cycle spends receiving
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrainConfig {
    /// Frames processed per cycle at most
    pub max_frames: usize,
    /// Wait applied to the first receive only; later receives poll
    pub first_timeout_ms: u64,
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            max_frames: 5,
            first_timeout_ms: 10,
        }
    }
}

/// Receive and route up to `max_frames` frames.
///
/// Does nothing unless the bus is running. Returns the number of frames
/// routed. Each routed frame refreshes the monitor's liveness timestamp.
pub fn drain<T: Transceiver + ?Sized>(
    transceiver: &mut T,
    router: &mut FrameRouter,
    monitor: &mut HealthMonitor,
    state: &mut VehicleState,
    config: &DrainConfig,
    now_ms: u64,
) -> usize {
    if monitor.state() != BusState::Running {
        return 0;
    }

    let mut routed = 0;
    while routed < config.max_frames {
        let timeout = if routed == 0 {
            Duration::from_millis(config.first_timeout_ms)
        } else {
            Duration::ZERO
        };
        match transceiver.receive(timeout) {
            Ok(frame) => {
                router.route(frame, now_ms, state);
                monitor.note_frame(now_ms);
                routed += 1;
            }
            Err(TransceiverError::Timeout) => break,
            Err(e) => {
                warn!("CAN receive failed: {}", e);
                break;
            }
        }
    }
    routed
}

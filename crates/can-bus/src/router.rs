//! Frame Router
//!
//! Every received frame is logged, then handed to the active protocol
//! decoder. Frames are processed strictly in arrival order.

use can_protocol::{FrameDecoder, ProtocolFrame, ProtocolVariant};
use metrics::counter;
use ring_buffer::RingBuffer;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vehicle_state::VehicleState;

/// Frames kept for diagnostics
pub const FRAME_LOG_CAPACITY: usize = 50;

/// A frame together with its receive time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedFrame {
    pub timestamp_ms: u64,
    pub frame: ProtocolFrame,
}

/// Recent-frame diagnostic log, oldest overwritten first
pub type FrameLog = RingBuffer<LoggedFrame, FRAME_LOG_CAPACITY>;

/// Dispatches frames to the decoder selected at startup
pub struct FrameRouter {
    decoder: Box<dyn FrameDecoder>,
    variant: ProtocolVariant,
    log: FrameLog,
    unrecognized: u64,
}

impl FrameRouter {
    pub fn new(variant: ProtocolVariant) -> Self {
        let decoder = variant.decoder();
        info!("Frame router using {} protocol", decoder.name());
        Self {
            decoder,
            variant,
            log: FrameLog::new(),
            unrecognized: 0,
        }
    }

    /// Log and decode one frame
    pub fn route(&mut self, frame: ProtocolFrame, now_ms: u64, state: &mut VehicleState) {
        self.log.push(LoggedFrame {
            timestamp_ms: now_ms,
            frame,
        });
        debug!("{}", frame);
        counter!("canled_frames_total").increment(1);

        if !self.decoder.recognizes(frame.raw_id()) {
            self.unrecognized += 1;
            counter!("canled_frames_unrecognized_total").increment(1);
            return;
        }
        self.decoder.decode(&frame, state);
    }

    pub fn protocol(&self) -> ProtocolVariant {
        self.variant
    }

    pub fn decoder(&self) -> &dyn FrameDecoder {
        self.decoder.as_ref()
    }

    pub fn log(&self) -> &FrameLog {
        &self.log
    }

    /// Frames routed since startup
    pub fn frames_routed(&self) -> u64 {
        self.log.total_written()
    }

    /// Frames whose id the active protocol does not know
    pub fn frames_unrecognized(&self) -> u64 {
        self.unrecognized
    }
}

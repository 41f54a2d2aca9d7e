//! Custom protocol (firmware build flag 0)

use super::{flag, standard_frame};
use crate::frame::ProtocolFrame;
use crate::protocol::FrameDecoder;
use crate::units::{le_u16, put_le_u16};
use vehicle_state::{Percent, VehicleState};

/// Message identifiers (standard 11-bit)
pub mod ids {
    /// data[0]: throttle %
    pub const THROTTLE: u32 = 0x100;
    /// data[0..3]: brake %, handbrake %, clutch %
    pub const PEDALS: u32 = 0x101;
    /// u16 LE: RPM
    pub const RPM: u32 = 0x102;
    /// u16 LE: coolant °C * 10
    pub const COOLANT: u32 = 0x103;
    /// u16 LE: oil pressure bar * 10
    pub const OIL_PRESSURE: u32 = 0x104;
    /// data[0] bit0 rev limiter, bit1 anti-lag
    pub const FLAGS: u32 = 0x105;
    /// data[0] non-zero when ignition is on
    pub const IGNITION: u32 = 0x106;
}

pub struct CustomDecoder;

impl FrameDecoder for CustomDecoder {
    fn name(&self) -> &'static str {
        "Custom Protocol"
    }

    fn recognizes(&self, id: u32) -> bool {
        (ids::THROTTLE..=ids::IGNITION).contains(&id)
    }

    fn decode(&self, frame: &ProtocolFrame, state: &mut VehicleState) {
        let data = frame.data();
        match frame.raw_id() {
            ids::THROTTLE => {
                if let Some(&throttle) = data.first() {
                    state.throttle = Percent::from(throttle);
                }
            }
            ids::PEDALS => {
                if let Some(&brake) = data.first() {
                    state.brake = Percent::from(brake);
                }
                if let Some(&handbrake) = data.get(1) {
                    state.handbrake = Percent::from(handbrake);
                }
                if let Some(&clutch) = data.get(2) {
                    state.clutch = Percent::from(clutch);
                }
            }
            ids::RPM => {
                if let Some(rpm) = le_u16(data, 0) {
                    state.set_rpm(rpm);
                }
            }
            ids::COOLANT => {
                if let Some(coolant) = le_u16(data, 0) {
                    state.coolant_temp = coolant;
                }
            }
            ids::OIL_PRESSURE => {
                if let Some(oil) = le_u16(data, 0) {
                    state.oil_pressure = oil;
                }
            }
            ids::FLAGS => {
                if let Some(&flags) = data.first() {
                    state.rev_limiter = flags & 0x01 != 0;
                    state.anti_lag = flags & 0x02 != 0;
                }
            }
            ids::IGNITION => {
                if let Some(&ignition) = data.first() {
                    state.ignition_on = ignition != 0;
                }
            }
            _ => {}
        }
    }

    fn encode(&self, state: &VehicleState) -> Vec<ProtocolFrame> {
        let mut rpm = [0u8; 8];
        put_le_u16(&mut rpm, 0, state.rpm);
        let mut coolant = [0u8; 8];
        put_le_u16(&mut coolant, 0, state.coolant_temp);
        let mut oil = [0u8; 8];
        put_le_u16(&mut oil, 0, state.oil_pressure);

        let flags = flag(state.rev_limiter, 0) | flag(state.anti_lag, 1);
        let pedals = [
            state.brake.get(),
            state.handbrake.get(),
            state.clutch.get(),
            0,
            0,
            0,
            0,
            0,
        ];

        vec![
            standard_frame(ids::THROTTLE, [state.throttle.get(), 0, 0, 0, 0, 0, 0, 0], 1),
            standard_frame(ids::PEDALS, pedals, 3),
            standard_frame(ids::RPM, rpm, 2),
            standard_frame(ids::COOLANT, coolant, 2),
            standard_frame(ids::OIL_PRESSURE, oil, 2),
            standard_frame(ids::FLAGS, [flags, 0, 0, 0, 0, 0, 0, 0], 1),
            standard_frame(ids::IGNITION, [state.ignition_on as u8, 0, 0, 0, 0, 0, 0, 0], 1),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(id: u32, payload: &[u8]) -> ProtocolFrame {
        ProtocolFrame::standard(id as u16, payload).unwrap()
    }

    fn decode(frames: &[ProtocolFrame]) -> VehicleState {
        let mut state = VehicleState::default();
        for f in frames {
            CustomDecoder.decode(f, &mut state);
        }
        state
    }

    #[test]
    fn test_rpm_example() {
        let state = decode(&[frame(ids::RPM, &[0xE8, 0x03])]);
        assert_eq!(state.rpm, 1000);
        assert!(state.engine_running);
    }

    #[test]
    fn test_coolant_example() {
        let state = decode(&[frame(ids::COOLANT, &[0x84, 0x03])]);
        assert_eq!(state.coolant_temp, 900);
        assert_eq!(state.coolant_celsius(), 90);
    }

    #[test]
    fn test_throttle_clamped() {
        let state = decode(&[frame(ids::THROTTLE, &[0xFF])]);
        assert_eq!(state.throttle.get(), 100);
    }

    #[test]
    fn test_partial_pedal_frame() {
        let mut state = VehicleState::default();
        state.clutch = Percent::saturating(33);
        CustomDecoder.decode(&frame(ids::PEDALS, &[50, 120]), &mut state);
        assert_eq!(state.brake.get(), 50);
        assert_eq!(state.handbrake.get(), 100);
        assert_eq!(state.clutch.get(), 33); // byte 2 missing
    }

    #[test]
    fn test_short_rpm_frame_is_skipped() {
        let mut state = VehicleState::default();
        state.set_rpm(2500);
        CustomDecoder.decode(&frame(ids::RPM, &[0x10]), &mut state);
        assert_eq!(state.rpm, 2500);
    }

    #[test]
    fn test_flags_and_ignition() {
        let state = decode(&[frame(ids::FLAGS, &[0x03]), frame(ids::IGNITION, &[0x01])]);
        assert!(state.rev_limiter);
        assert!(state.anti_lag);
        assert!(state.ignition_on);
        assert!(!state.engine_running); // ignition does not imply running
    }

    #[test]
    fn test_unknown_id_ignored() {
        let state = decode(&[frame(0x5F0, &[1, 2, 3, 4, 5, 6, 7, 8])]);
        assert_eq!(state, VehicleState::default());
        assert!(!CustomDecoder.recognizes(0x5F0));
    }
}

//! Link ECU Generic Dashboard 2 (firmware build flag 2)

use super::{extended_frame, flag};
use crate::frame::ProtocolFrame;
use crate::protocol::FrameDecoder;
use crate::units::{le_i16, le_u16, put_le_u16, tenths_to_percent};
use vehicle_state::{Percent, VehicleState};

/// Message identifiers (extended 29-bit)
pub mod ids {
    /// RPM, TPS % * 10, ECT, IAT
    pub const ENGINE_DATA_1: u32 = 0x2000;
    /// MAP, battery V * 100, fuel pressure, oil pressure
    pub const ENGINE_DATA_2: u32 = 0x2001;
    /// Lambda * 100, ignition timing, fuel level
    pub const ENGINE_DATA_3: u32 = 0x2002;
    /// Boost and idle control, not mapped
    pub const ENGINE_DATA_4: u32 = 0x2003;
    /// Speed, gear, launch / flat shift flags
    pub const VEHICLE_DATA_1: u32 = 0x2004;
    /// Wheel speeds, not mapped
    pub const VEHICLE_DATA_2: u32 = 0x2005;
    /// [0] bit0 rev limiter, bit7 ignition
    pub const FLAGS_WARNINGS: u32 = 0x2006;
    /// User analog inputs, not mapped
    pub const ANALOG_INPUTS: u32 = 0x2007;
}

const SIM_MAP: u16 = 1000;
const SIM_FUEL_LEVEL: u16 = 50;

pub struct LinkGeneric2Decoder;

impl FrameDecoder for LinkGeneric2Decoder {
    fn name(&self) -> &'static str {
        "Link ECU Generic Dashboard 2"
    }

    fn recognizes(&self, id: u32) -> bool {
        (ids::ENGINE_DATA_1..=ids::ANALOG_INPUTS).contains(&id)
    }

    fn decode(&self, frame: &ProtocolFrame, state: &mut VehicleState) {
        let data = frame.data();
        match frame.raw_id() {
            ids::ENGINE_DATA_1 => {
                if let Some(rpm) = le_u16(data, 0) {
                    state.set_rpm(rpm);
                }
                if let Some(tps) = le_u16(data, 2) {
                    state.throttle = Percent::from(tenths_to_percent(tps));
                }
                if let Some(ect) = le_u16(data, 4) {
                    state.coolant_temp = ect;
                }
                if let Some(iat) = le_u16(data, 6) {
                    state.air_temp = iat;
                }
            }
            ids::ENGINE_DATA_2 => {
                if let Some(voltage) = le_u16(data, 2) {
                    state.battery_voltage = voltage;
                }
                if let Some(fuel) = le_u16(data, 4) {
                    state.fuel_pressure = fuel;
                }
                if let Some(oil) = le_u16(data, 6) {
                    state.oil_pressure = oil;
                }
            }
            ids::ENGINE_DATA_3 => {
                if let Some(lambda) = le_u16(data, 0) {
                    state.lambda = lambda;
                }
                if let Some(timing) = le_i16(data, 2) {
                    state.ignition_timing = timing;
                }
            }
            ids::VEHICLE_DATA_1 => {
                if let Some(speed) = le_u16(data, 0) {
                    state.vehicle_speed = speed;
                }
                if let Some(&gear) = data.get(2) {
                    state.gear = gear;
                }
                if let Some(&flags) = data.get(3) {
                    state.launch_control = flags & 0x01 != 0;
                    state.flat_shift = flags & 0x02 != 0;
                }
            }
            ids::FLAGS_WARNINGS => {
                if let Some(&flags) = data.first() {
                    state.rev_limiter = flags & 0x01 != 0;
                    state.ignition_on = flags & 0x80 != 0;
                }
            }
            _ => {}
        }
    }

    fn encode(&self, state: &VehicleState) -> Vec<ProtocolFrame> {
        let mut engine1 = [0u8; 8];
        put_le_u16(&mut engine1, 0, state.rpm);
        put_le_u16(&mut engine1, 2, state.throttle.get() as u16 * 10);
        put_le_u16(&mut engine1, 4, state.coolant_temp);
        put_le_u16(&mut engine1, 6, state.air_temp);

        let mut engine2 = [0u8; 8];
        put_le_u16(&mut engine2, 0, SIM_MAP);
        put_le_u16(&mut engine2, 2, state.battery_voltage);
        put_le_u16(&mut engine2, 4, state.fuel_pressure);
        put_le_u16(&mut engine2, 6, state.oil_pressure);

        let mut engine3 = [0u8; 8];
        put_le_u16(&mut engine3, 0, state.lambda);
        put_le_u16(&mut engine3, 2, state.ignition_timing as u16);
        put_le_u16(&mut engine3, 4, SIM_FUEL_LEVEL);

        let mut vehicle1 = [0u8; 8];
        put_le_u16(&mut vehicle1, 0, state.vehicle_speed);
        vehicle1[2] = state.gear;
        vehicle1[3] = flag(state.launch_control, 0) | flag(state.flat_shift, 1);

        let mut warnings = [0u8; 8];
        warnings[0] = flag(state.rev_limiter, 0) | flag(state.ignition_on, 7);

        vec![
            extended_frame(ids::ENGINE_DATA_1, engine1, 8),
            extended_frame(ids::ENGINE_DATA_2, engine2, 8),
            extended_frame(ids::ENGINE_DATA_3, engine3, 6),
            extended_frame(ids::VEHICLE_DATA_1, vehicle1, 4),
            extended_frame(ids::FLAGS_WARNINGS, warnings, 2),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(id: u32, payload: &[u8]) -> ProtocolFrame {
        ProtocolFrame::extended(id, payload).unwrap()
    }

    #[test]
    fn test_engine_data_1_full() {
        let mut state = VehicleState::default();
        let payload = [0xE8, 0x03, 0xE8, 0x03, 0x84, 0x03, 0xFA, 0x00];
        LinkGeneric2Decoder.decode(&frame(ids::ENGINE_DATA_1, &payload), &mut state);
        assert_eq!(state.rpm, 1000);
        assert_eq!(state.throttle.get(), 100);
        assert_eq!(state.coolant_temp, 900);
        assert_eq!(state.air_temp, 250);
    }

    #[test]
    fn test_engine_data_1_truncated() {
        let mut state = VehicleState::default();
        state.coolant_temp = 777;
        LinkGeneric2Decoder.decode(&frame(ids::ENGINE_DATA_1, &[0x2C, 0x01, 0x64, 0x00, 0x84]), &mut state);
        assert_eq!(state.rpm, 300);
        assert!(!state.engine_running); // 300 is not above the threshold
        assert_eq!(state.throttle.get(), 10);
        assert_eq!(state.coolant_temp, 777);
    }

    #[test]
    fn test_engine_data_2_offsets() {
        let mut state = VehicleState::default();
        LinkGeneric2Decoder.decode(
            &frame(ids::ENGINE_DATA_2, &[0xE8, 0x03, 0x4C, 0x04, 0x1E, 0x00, 0x0F, 0x00]),
            &mut state,
        );
        assert_eq!(state.battery_voltage, 1100);
        assert_eq!(state.fuel_pressure, 30);
        assert_eq!(state.oil_pressure, 15);
    }

    #[test]
    fn test_vehicle_and_flag_frames() {
        let mut state = VehicleState::default();
        LinkGeneric2Decoder.decode(&frame(ids::VEHICLE_DATA_1, &[0xE8, 0x03, 5, 0x03]), &mut state);
        LinkGeneric2Decoder.decode(&frame(ids::FLAGS_WARNINGS, &[0x81]), &mut state);
        assert_eq!(state.vehicle_speed, 1000);
        assert_eq!(state.gear, 5);
        assert!(state.launch_control && state.flat_shift);
        assert!(state.rev_limiter && state.ignition_on);
    }

    #[test]
    fn test_encode_scenario_decodes_back() {
        let mut source = VehicleState::default();
        source.set_rpm(3400);
        source.throttle = Percent::saturating(45);
        source.oil_pressure = 15;
        source.battery_voltage = 1385;
        source.launch_control = true;
        source.rev_limiter = true;

        let mut decoded = VehicleState::default();
        for f in LinkGeneric2Decoder.encode(&source) {
            assert!(f.id().is_extended());
            LinkGeneric2Decoder.decode(&f, &mut decoded);
        }
        assert_eq!(decoded, source);
    }
}

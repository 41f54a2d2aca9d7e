//! Link ECU Generic Dashboard (firmware build flag 1)

use super::{flag, standard_frame};
use crate::frame::ProtocolFrame;
use crate::protocol::FrameDecoder;
use crate::units::{le_i16, le_u16, le_u32, put_le_u16, put_le_u32, saturate_u16, tenths_to_percent};
use vehicle_state::{Percent, VehicleState};

/// Message identifiers (standard 11-bit)
pub mod ids {
    /// [0..4] RPM u32, [4..6] TPS % * 10
    pub const RPM_TPS: u32 = 0x5F0;
    /// [0..2] fuel pressure, [2..4] ignition timing (signed, ° * 10)
    pub const FUEL_IGN: u32 = 0x5F1;
    /// [0..2] MAP, [2..4] baro, [4..6] lambda * 100
    pub const PRESSURES: u32 = 0x5F2;
    /// [0..2] coolant, [2..4] air temp (°C * 10)
    pub const TEMPERATURES: u32 = 0x5F3;
    /// [0..2] battery V * 100, [2] flags
    pub const VOLTAGE_FLAGS: u32 = 0x5F4;
    /// [0] gear, [2..4] oil pressure
    pub const GEAR_OIL: u32 = 0x5F5;
    /// [0..2] vehicle speed km/h * 10
    pub const VEHICLE_SPEED: u32 = 0x5F6;
    /// Secondary throttle sensors, not mapped
    pub const THROTTLE_SENSORS: u32 = 0x5F7;
}

/// Nominal MAP/baro sent by the simulator (kPa * 10)
const SIM_MAP: u16 = 1000;
const SIM_BARO: u16 = 1010;

pub struct LinkGenericDecoder;

impl FrameDecoder for LinkGenericDecoder {
    fn name(&self) -> &'static str {
        "Link ECU Generic Dashboard"
    }

    fn recognizes(&self, id: u32) -> bool {
        (ids::RPM_TPS..=ids::THROTTLE_SENSORS).contains(&id)
    }

    fn decode(&self, frame: &ProtocolFrame, state: &mut VehicleState) {
        let data = frame.data();
        match frame.raw_id() {
            ids::RPM_TPS => {
                if let Some(rpm) = le_u32(data, 0) {
                    state.set_rpm(saturate_u16(rpm));
                }
                if let Some(tps) = le_u16(data, 4) {
                    state.throttle = Percent::from(tenths_to_percent(tps));
                }
            }
            ids::FUEL_IGN => {
                if let Some(fuel) = le_u16(data, 0) {
                    state.fuel_pressure = fuel;
                }
                if let Some(timing) = le_i16(data, 2) {
                    state.ignition_timing = timing;
                }
            }
            ids::PRESSURES => {
                if let Some(lambda) = le_u16(data, 4) {
                    state.lambda = lambda;
                }
            }
            ids::TEMPERATURES => {
                if let Some(coolant) = le_u16(data, 0) {
                    state.coolant_temp = coolant;
                }
                if let Some(air) = le_u16(data, 2) {
                    state.air_temp = air;
                }
            }
            ids::VOLTAGE_FLAGS => {
                if let Some(voltage) = le_u16(data, 0) {
                    state.battery_voltage = voltage;
                }
                if let Some(&flags) = data.get(2) {
                    state.rev_limiter = flags & 0x01 != 0;
                    state.launch_control = flags & 0x02 != 0;
                    state.flat_shift = flags & 0x04 != 0;
                    state.ignition_on = flags & 0x80 != 0;
                }
            }
            ids::GEAR_OIL => {
                if let Some(&gear) = data.first() {
                    state.gear = gear;
                }
                if let Some(oil) = le_u16(data, 2) {
                    state.oil_pressure = oil;
                }
            }
            ids::VEHICLE_SPEED => {
                if let Some(speed) = le_u16(data, 0) {
                    state.vehicle_speed = speed;
                }
            }
            _ => {}
        }
    }

    fn encode(&self, state: &VehicleState) -> Vec<ProtocolFrame> {
        let mut rpm_tps = [0u8; 8];
        put_le_u32(&mut rpm_tps, 0, state.rpm as u32);
        put_le_u16(&mut rpm_tps, 4, state.throttle.get() as u16 * 10);

        let mut fuel_ign = [0u8; 8];
        put_le_u16(&mut fuel_ign, 0, state.fuel_pressure);
        put_le_u16(&mut fuel_ign, 2, state.ignition_timing as u16);

        let mut pressures = [0u8; 8];
        put_le_u16(&mut pressures, 0, SIM_MAP);
        put_le_u16(&mut pressures, 2, SIM_BARO);
        put_le_u16(&mut pressures, 4, state.lambda);

        let mut temps = [0u8; 8];
        put_le_u16(&mut temps, 0, state.coolant_temp);
        put_le_u16(&mut temps, 2, state.air_temp);

        let mut voltage = [0u8; 8];
        put_le_u16(&mut voltage, 0, state.battery_voltage);
        voltage[2] = flag(state.rev_limiter, 0)
            | flag(state.launch_control, 1)
            | flag(state.flat_shift, 2)
            | flag(state.ignition_on, 7);

        let mut gear_oil = [0u8; 8];
        gear_oil[0] = state.gear;
        put_le_u16(&mut gear_oil, 2, state.oil_pressure);

        let mut speed = [0u8; 8];
        put_le_u16(&mut speed, 0, state.vehicle_speed);

        vec![
            standard_frame(ids::RPM_TPS, rpm_tps, 6),
            standard_frame(ids::FUEL_IGN, fuel_ign, 4),
            standard_frame(ids::PRESSURES, pressures, 6),
            standard_frame(ids::TEMPERATURES, temps, 4),
            standard_frame(ids::VOLTAGE_FLAGS, voltage, 4),
            standard_frame(ids::GEAR_OIL, gear_oil, 4),
            standard_frame(ids::VEHICLE_SPEED, speed, 2),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(id: u32, payload: &[u8]) -> ProtocolFrame {
        ProtocolFrame::standard(id as u16, payload).unwrap()
    }

    #[test]
    fn test_rpm_and_tps() {
        let mut state = VehicleState::default();
        // 1000 rpm, TPS 45.5 % -> 45
        LinkGenericDecoder.decode(&frame(ids::RPM_TPS, &[0xE8, 0x03, 0, 0, 0xC7, 0x01]), &mut state);
        assert_eq!(state.rpm, 1000);
        assert!(state.engine_running);
        assert_eq!(state.throttle.get(), 45);
    }

    #[test]
    fn test_rpm_saturates_and_tps_clamps() {
        let mut state = VehicleState::default();
        LinkGenericDecoder.decode(&frame(ids::RPM_TPS, &[0xFF, 0xFF, 0xFF, 0x00, 0xFF, 0xFF]), &mut state);
        assert_eq!(state.rpm, u16::MAX);
        assert_eq!(state.throttle.get(), 100);
    }

    #[test]
    fn test_rpm_without_tps_bytes() {
        let mut state = VehicleState::default();
        state.throttle = Percent::saturating(12);
        LinkGenericDecoder.decode(&frame(ids::RPM_TPS, &[0xE8, 0x03, 0, 0, 0x10]), &mut state);
        assert_eq!(state.rpm, 1000);
        assert_eq!(state.throttle.get(), 12);

        // three bytes: not enough for the u32 rpm field
        LinkGenericDecoder.decode(&frame(ids::RPM_TPS, &[0x00, 0x00, 0x00]), &mut state);
        assert_eq!(state.rpm, 1000);
    }

    #[test]
    fn test_signed_ignition_timing() {
        let mut state = VehicleState::default();
        LinkGenericDecoder.decode(&frame(ids::FUEL_IGN, &[0x2C, 0x01, 0xE7, 0xFF]), &mut state);
        assert_eq!(state.fuel_pressure, 300);
        assert_eq!(state.ignition_timing, -25);
    }

    #[test]
    fn test_voltage_flags() {
        let mut state = VehicleState::default();
        LinkGenericDecoder.decode(&frame(ids::VOLTAGE_FLAGS, &[0x78, 0x05, 0x87]), &mut state);
        assert_eq!(state.battery_voltage, 1400);
        assert!(state.rev_limiter);
        assert!(state.launch_control);
        assert!(state.flat_shift);
        assert!(state.ignition_on);
    }

    #[test]
    fn test_lambda_needs_six_bytes() {
        let mut state = VehicleState::default();
        LinkGenericDecoder.decode(&frame(ids::PRESSURES, &[0, 0, 0, 0, 0x62]), &mut state);
        assert_eq!(state.lambda, 100);
        LinkGenericDecoder.decode(&frame(ids::PRESSURES, &[0, 0, 0, 0, 0x62, 0x00]), &mut state);
        assert_eq!(state.lambda, 98);
    }

    #[test]
    fn test_gear_oil_partial() {
        let mut state = VehicleState::default();
        LinkGenericDecoder.decode(&frame(ids::GEAR_OIL, &[3, 0]), &mut state);
        assert_eq!(state.gear, 3);
        assert_eq!(state.oil_pressure, 30);
    }

    #[test]
    fn test_encode_scenario_decodes_back() {
        let mut source = VehicleState::default();
        source.set_rpm(6200);
        source.throttle = Percent::saturating(87);
        source.coolant_temp = 935;
        source.oil_pressure = 42;
        source.ignition_timing = -40;
        source.gear = 4;
        source.ignition_on = true;
        source.flat_shift = true;

        let mut decoded = VehicleState::default();
        for f in LinkGenericDecoder.encode(&source) {
            assert!(LinkGenericDecoder.recognizes(f.raw_id()));
            LinkGenericDecoder.decode(&f, &mut decoded);
        }
        assert_eq!(decoded, source);
    }
}

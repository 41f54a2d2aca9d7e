//! Layered LED Compositor
//!
//! A frame is rebuilt from black every cycle by running the stages of
//! [`PIPELINE`] in order. Later stages draw over earlier ones, so a bus
//! fault always wins over vehicle data and a critical engine fault wins
//! over every other conditional effect.

use crate::color::{map_to_u8, Rgb};
use crate::frame::LedFrame;
use crate::oscillator::{square, Wave};
use crate::tables::LookupTables;
use can_bus::BusState;
use serde::{Deserialize, Serialize};
use vehicle_state::VehicleState;

/// Compositor stages, in paint order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Standby breathing or throttle bar
    Base,
    RpmGradient,
    CoolantPixel,
    /// Brake, handbrake and clutch overlays
    Pedals,
    /// Rev limiter, anti-lag, warm-up, shift point, critical fault
    Effects,
    /// Bus fault and stale data
    BusOverlay,
}

pub const PIPELINE: [Stage; 6] = [
    Stage::Base,
    Stage::RpmGradient,
    Stage::CoolantPixel,
    Stage::Pedals,
    Stage::Effects,
    Stage::BusOverlay,
];

const STANDBY_COLOR: Rgb = Rgb::new(80, 60, 0);
// Rates in beats per minute
const STANDBY_WAVE: Wave = Wave::new(5.0, 20, 80);
const REDLINE_WAVE: Wave = Wave::new(5.0, 64, 255);
const REV_LIMITER_WAVE: Wave = Wave::new(8.0, 96, 255);
const ANTI_LAG_WAVE: Wave = Wave::new(12.0, 80, 200);
const WARMING_WAVE: Wave = Wave::new(6.0, 40, 120);
const SHIFT_WAVE: Wave = Wave::new(15.0, 128, 255);
const CRITICAL_WAVE: Wave = Wave::new(18.0, 180, 255);
const BUS_FAULT_WAVE: Wave = Wave::new(4.0, 0, 255);
const STALE_WAVE: Wave = Wave::new(3.0, 20, 100);

const HANDBRAKE_COLOR: Rgb = Rgb::new(180, 0, 180);
const CLUTCH_COLOR: Rgb = Rgb::new(0, 120, 255);
const SEGMENT_ALPHA: u8 = 192;
const RPM_ALPHA: u8 = 128;

/// Coolant range shown by the temperature pixel (0.1 °C)
const COOLANT_COLD: u16 = 600;
const COOLANT_MID: u16 = 850;
const COOLANT_HOT: u16 = 1100;

/// Pixels at each end used by the shift light
const SHIFT_LED_COUNT: usize = 5;
/// Strobe half-period of the critical fault effect
const CRITICAL_STROBE_MS: u64 = 200;
/// Critical fault: throttle above this with oil pressure below the next
const CRITICAL_THROTTLE: u8 = 40;
const CRITICAL_OIL_PRESSURE: u16 = 20;

/// Rendering thresholds taken from runtime configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// 0 disables the RPM layer
    pub redline_rpm: u16,
    pub shift_rpm: u16,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            redline_rpm: 6500,
            shift_rpm: 6175,
        }
    }
}

/// Everything one render reads
#[derive(Debug, Clone, Copy)]
pub struct RenderInput<'a> {
    pub state: &'a VehicleState,
    pub bus: BusState,
    pub stale: bool,
    pub now_ms: u64,
}

/// Renders vehicle state into an `N`-pixel frame
#[derive(Debug, Clone)]
pub struct Compositor<const N: usize> {
    config: RenderConfig,
    tables: LookupTables<N>,
}

impl<const N: usize> Compositor<N> {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            tables: LookupTables::new(),
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Apply new thresholds. Lookup tables depend on `N` only and are kept.
    pub fn reconfigure(&mut self, config: RenderConfig) {
        self.config = config;
    }

    /// Clear `frame` and run every stage
    pub fn render(&self, input: &RenderInput<'_>, frame: &mut LedFrame<N>) {
        frame.clear();
        for stage in PIPELINE {
            self.render_stage(stage, input, frame);
        }
    }

    pub fn render_stage(&self, stage: Stage, input: &RenderInput<'_>, frame: &mut LedFrame<N>) {
        match stage {
            Stage::Base => self.draw_base(input, frame),
            Stage::RpmGradient => self.draw_rpm(input, frame),
            Stage::CoolantPixel => draw_coolant(input.state, frame),
            Stage::Pedals => draw_pedals(input.state, frame),
            Stage::Effects => self.draw_effects(input, frame),
            Stage::BusOverlay => draw_bus_overlay(input, frame),
        }
    }

    fn draw_base(&self, input: &RenderInput<'_>, frame: &mut LedFrame<N>) {
        let state = input.state;
        if is_standby(state) {
            let breathe = STANDBY_WAVE.sample(input.now_ms);
            frame.fill(STANDBY_COLOR.scale_video(breathe + 60));
            return;
        }
        let lit = self.tables.throttle_lit(state.throttle.get());
        frame.fill_range(0..lit, Rgb::GREEN);
    }

    fn draw_rpm(&self, input: &RenderInput<'_>, frame: &mut LedFrame<N>) {
        let redline = self.config.redline_rpm as u32;
        if redline == 0 {
            return;
        }
        let rpm = input.state.rpm as u32;
        if rpm >= redline {
            let pulse = REDLINE_WAVE.sample(input.now_ms);
            frame.fill(Rgb::new(pulse, 0, 0));
            return;
        }

        let cap = N + N / 5;
        let lit = (((rpm * N as u32 + redline / 2) / redline) as usize).min(cap);
        for (i, pixel) in frame.pixels_mut().iter_mut().enumerate().take(lit) {
            *pixel = pixel.blend(self.tables.rpm_color(i), RPM_ALPHA);
        }
    }

    fn draw_effects(&self, input: &RenderInput<'_>, frame: &mut LedFrame<N>) {
        let state = input.state;
        let now = input.now_ms;

        if state.rev_limiter {
            let p = REV_LIMITER_WAVE.sample(now);
            frame.blend_all(Rgb::new(p, p, 0), SEGMENT_ALPHA);
        }
        if state.anti_lag {
            let p = ANTI_LAG_WAVE.sample(now);
            frame.blend_all(Rgb::new(p, 80, 0), 160);
        }
        if is_warming_up(state) {
            let p = WARMING_WAVE.sample(now);
            frame.blend_all(Rgb::new(0, 100, p + 40), 128);
        }
        if self.shift_point_reached(state) {
            let color = Rgb::new(0, 0, SHIFT_WAVE.sample(now));
            let count = SHIFT_LED_COUNT.min(N);
            frame.fill_range(0..count, color);
            frame.fill_range(N - count..N, color);
        }
        if is_critical_fault(state) {
            let pulse = Rgb::new(CRITICAL_WAVE.sample(now), 0, 0);
            let strobe = if square(now, CRITICAL_STROBE_MS) {
                Rgb::WHITE
            } else {
                Rgb::RED
            };
            frame.fill(strobe.blend(pulse, 200));
        }
    }

    fn shift_point_reached(&self, state: &VehicleState) -> bool {
        self.config.shift_rpm > 0 && state.rpm >= self.config.shift_rpm
    }

    /// Names of the visual modes the given state would show
    pub fn active_modes(&self, state: &VehicleState) -> Vec<&'static str> {
        active_modes(state, &self.config)
    }
}

fn draw_coolant<const N: usize>(state: &VehicleState, frame: &mut LedFrame<N>) {
    if N == 0 {
        return;
    }
    frame.set(N - 1, coolant_color(state.coolant_temp));
}

/// Blue (cold) through green to red (hot)
pub fn coolant_color(coolant_temp: u16) -> Rgb {
    let t = coolant_temp.clamp(COOLANT_COLD, COOLANT_HOT) as u32;
    let half = (COOLANT_HOT - COOLANT_MID) as u32;
    if t <= COOLANT_MID as u32 {
        let mix = (t - COOLANT_COLD as u32) * 255 / half;
        Rgb::BLUE.blend(Rgb::GREEN, mix as u8)
    } else {
        let mix = (t - COOLANT_MID as u32) * 255 / half;
        Rgb::GREEN.blend(Rgb::RED, mix as u8)
    }
}

fn draw_pedals<const N: usize>(state: &VehicleState, frame: &mut LedFrame<N>) {
    let brake = state.brake.get();
    if brake > 0 {
        let intensity = map_to_u8(brake as i32, 0, 100, 20, 255);
        frame.blend_all(Rgb::new(intensity, 0, 0), intensity);
    }

    let handbrake = state.handbrake.get();
    if handbrake > 0 {
        let scale = map_to_u8(handbrake as i32, 0, 100, 10, 220);
        frame.blend_range(0..N / 4, HANDBRAKE_COLOR.scale_video(scale), SEGMENT_ALPHA);
    }

    let clutch = state.clutch.get();
    if clutch > 0 {
        let scale = map_to_u8(clutch as i32, 0, 100, 10, 220);
        frame.blend_range(N - N / 5..N, CLUTCH_COLOR.scale_video(scale), SEGMENT_ALPHA);
    }
}

fn draw_bus_overlay<const N: usize>(input: &RenderInput<'_>, frame: &mut LedFrame<N>) {
    if input.bus.is_fault() {
        let p = BUS_FAULT_WAVE.sample(input.now_ms);
        frame.fill(Rgb::new(p, 0, 0));
        return;
    }
    if input.stale && input.bus == BusState::Running {
        let p = STALE_WAVE.sample(input.now_ms);
        let warning = Rgb::new(p, p / 2, 0);
        for pixel in frame.pixels_mut().iter_mut().step_by(4) {
            *pixel = warning;
        }
    }
}

fn is_standby(state: &VehicleState) -> bool {
    state.ignition_on && !state.engine_running
}

fn is_warming_up(state: &VehicleState) -> bool {
    state.ignition_on && state.coolant_temp < COOLANT_COLD
}

fn is_critical_fault(state: &VehicleState) -> bool {
    state.throttle.get() > CRITICAL_THROTTLE && state.oil_pressure < CRITICAL_OIL_PRESSURE
}

/// Names of the visual modes the given state would show
pub fn active_modes(state: &VehicleState, config: &RenderConfig) -> Vec<&'static str> {
    let mut modes = vec!["base"];
    if !state.brake.is_zero() {
        modes.push("brake");
    }
    if !state.handbrake.is_zero() {
        modes.push("handbrake");
    }
    if !state.clutch.is_zero() {
        modes.push("clutch");
    }
    if state.rev_limiter {
        modes.push("rev_limiter");
    }
    if config.redline_rpm > 0 && state.rpm >= config.redline_rpm {
        modes.push("redline");
    }
    if state.anti_lag {
        modes.push("als");
    }
    if is_warming_up(state) {
        modes.push("warming_up");
    }
    if is_critical_fault(state) {
        modes.push("panic_oil");
    }
    if config.shift_rpm > 0 && state.rpm >= config.shift_rpm {
        modes.push("shift");
    }
    modes
}

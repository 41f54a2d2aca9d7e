//! Layered LED rendering
//!
//! Turns a [`vehicle_state::VehicleState`] plus bus health into a frame of
//! pixels by painting fixed stages in order, then hands the frame to an
//! [`LedStrip`].

mod brightness;
pub mod color;
mod compositor;
mod frame;
pub mod oscillator;
mod strip;
mod tables;

pub use brightness::{BrightnessPolicy, BrightnessSchedule, BRIGHTNESS_REFRESH_MS};
pub use color::Rgb;
pub use compositor::{active_modes, coolant_color, Compositor, RenderConfig, RenderInput, Stage, PIPELINE};
pub use frame::LedFrame;
pub use strip::{
    format_stream_line, self_test, LedStrip, RecordingStrip, SerialStreamStrip, StripError,
    SELF_TEST_DURATION_MS, SELF_TEST_STEP_MS, STREAM_INTERVAL_MS,
};
pub use tables::LookupTables;

/// Pixels on the production strip
pub const LED_COUNT: usize = 60;

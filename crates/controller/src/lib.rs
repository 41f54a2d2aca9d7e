//! CAN LED Controller
//!
//! Wires the bus layer, decoder and compositor into a single control loop,
//! publishes a read-only snapshot for other threads and applies runtime
//! configuration updates between cycles.

mod config;
mod controller;
pub mod demo;
mod snapshot;

pub use config::{default_shift_rpm, ConfigError, ConfigUpdate, RuntimeConfig, BRIGHTNESS_RANGE, REDLINE_RANGE};
pub use controller::{ControlCommand, Controller, ControllerSettings, CycleReport, TimingConfig};
pub use demo::{DemoScenario, DemoTransceiver};
pub use snapshot::{FrameView, Readings, Snapshot, SnapshotHandle};

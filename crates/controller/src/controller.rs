//! Control Loop
//!
//! One cycle, strictly in this order:
//! 1. Bus health poll (rate-limited by the monitor)
//! 2. Bounded frame drain, only while the bus is running
//! 3. Trip statistics update
//! 4. Full LED recomposition
//! 5. Brightness refresh and hardware push
//! 6. Pending commands, then snapshot publication
//!
//! The loop owns every piece of mutable state; other threads only see the
//! published [`Snapshot`] and talk back through a command channel.

use crate::config::{ConfigError, ConfigUpdate, RuntimeConfig};
use crate::snapshot::{FrameView, Readings, Snapshot, SnapshotHandle};
use can_bus::{
    drain, BusConfig, BusState, DrainConfig, FrameRouter, HealthConfig, HealthError,
    HealthMonitor, Transceiver, Transition,
};
use led_compositor::{
    self_test, BrightnessSchedule, Compositor, LedFrame, LedStrip, RenderInput, LED_COUNT,
    SELF_TEST_DURATION_MS,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use vehicle_state::{TripStatistics, VehicleState};

/// Loop pacing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    #[serde(flatten)]
    pub drain: DrainConfig,
    /// Minimum time between snapshot publications
    pub publish_interval_ms: u64,
    /// Sleep between cycles
    pub cycle_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            drain: DrainConfig::default(),
            publish_interval_ms: 100,
            cycle_interval_ms: 10,
        }
    }
}

/// Everything needed to build a controller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    pub runtime: RuntimeConfig,
    pub bus: BusConfig,
    pub health: HealthConfig,
    pub timing: TimingConfig,
}

/// Requests sent to the loop from other threads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    UpdateConfig(ConfigUpdate),
    ResetTrip,
}

/// What one cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleReport {
    pub frames: usize,
    pub transition: Option<Transition>,
    pub published: bool,
}

/// The single owner of vehicle state, frame log and LED frame
pub struct Controller<T: Transceiver, S: LedStrip> {
    transceiver: T,
    strip: S,
    bus: BusConfig,
    timing: TimingConfig,
    router: FrameRouter,
    monitor: HealthMonitor,
    state: VehicleState,
    trip: TripStatistics,
    compositor: Compositor<LED_COUNT>,
    frame: LedFrame<LED_COUNT>,
    config: RuntimeConfig,
    brightness: u8,
    brightness_schedule: BrightnessSchedule,
    commands: Option<mpsc::Receiver<ControlCommand>>,
    snapshot: SnapshotHandle,
    last_publish_ms: Option<u64>,
}

impl<T: Transceiver, S: LedStrip> Controller<T, S> {
    pub fn new(transceiver: T, strip: S, settings: ControllerSettings) -> Self {
        let config = settings.runtime;
        Self {
            transceiver,
            strip,
            bus: BusConfig {
                protocol: Some(config.protocol),
                ..settings.bus
            },
            timing: settings.timing,
            router: FrameRouter::new(config.protocol),
            monitor: HealthMonitor::new(settings.health),
            state: VehicleState::default(),
            trip: TripStatistics::new(0),
            compositor: Compositor::new(config.render_config()),
            frame: LedFrame::new(),
            config,
            brightness: config.brightness,
            brightness_schedule: BrightnessSchedule::default(),
            commands: None,
            snapshot: SnapshotHandle::new(),
            last_publish_ms: None,
        }
    }

    /// Attach the receiving end of the command channel
    pub fn with_commands(mut self, commands: mpsc::Receiver<ControlCommand>) -> Self {
        self.commands = Some(commands);
        self
    }

    /// Use an existing snapshot handle, e.g. one already given to the HTTP server
    pub fn with_snapshot(mut self, snapshot: SnapshotHandle) -> Self {
        self.snapshot = snapshot;
        self
    }

    pub fn snapshot_handle(&self) -> SnapshotHandle {
        self.snapshot.clone()
    }

    /// Bring up the bus. Install or start failures leave the bus `Failed`
    /// and the loop keeps rendering the fault.
    pub fn start(&mut self, now_ms: u64) -> Result<BusState, HealthError> {
        let state = self.monitor.start(&mut self.transceiver, &self.bus, now_ms)?;
        self.trip.reset(now_ms);
        if state == BusState::Failed {
            error!("CAN bus unavailable: {}", self.monitor.message());
        }
        self.publish(now_ms);
        Ok(state)
    }

    /// Run one control cycle at `now_ms`
    pub fn cycle(&mut self, now_ms: u64) -> CycleReport {
        let transition = self.monitor.poll(&mut self.transceiver, now_ms);
        if let Some(t) = transition {
            info!("CAN bus {:?} -> {:?}", t.from, t.to);
        }

        let frames = drain(
            &mut self.transceiver,
            &mut self.router,
            &mut self.monitor,
            &mut self.state,
            &self.timing.drain,
            now_ms,
        );

        self.trip.update(&self.state, now_ms);

        let input = RenderInput {
            state: &self.state,
            bus: self.monitor.state(),
            stale: self.monitor.is_stale(now_ms),
            now_ms,
        };
        self.compositor.render(&input, &mut self.frame);

        if self.brightness_schedule.due(now_ms) {
            self.brightness = self.config.brightness_policy().current();
            self.strip.set_global_brightness(self.brightness);
            debug!("LED brightness {}", self.brightness);
        }
        if let Err(e) = self.strip.push(self.frame.pixels(), now_ms) {
            warn!("LED push failed: {}", e);
        }

        self.process_commands(now_ms);

        let published = self.publish_due(now_ms);
        if published {
            self.publish(now_ms);
        }

        CycleReport {
            frames,
            transition,
            published,
        }
    }

    fn process_commands(&mut self, now_ms: u64) {
        let Some(commands) = self.commands.as_mut() else {
            return;
        };
        let mut pending = Vec::new();
        while let Ok(command) = commands.try_recv() {
            pending.push(command);
        }
        for command in pending {
            match command {
                ControlCommand::UpdateConfig(update) => {
                    if let Err(e) = self.apply_update(&update) {
                        warn!("Rejected configuration update: {}", e);
                    }
                }
                ControlCommand::ResetTrip => self.trip.reset(now_ms),
            }
            // Readers see the effect on this cycle
            self.last_publish_ms = None;
        }
    }

    /// Validate and apply a partial configuration change
    pub fn apply_update(&mut self, update: &ConfigUpdate) -> Result<&RuntimeConfig, ConfigError> {
        let next = update.apply_to(&self.config)?;
        if next != self.config {
            info!(
                "Configuration updated (redline {}, shift {}, brightness {})",
                next.rpm_redline, next.shift_light_rpm, next.brightness
            );
            self.config = next;
            self.compositor.reconfigure(next.render_config());
            self.brightness_schedule.invalidate();
        }
        Ok(&self.config)
    }

    fn publish_due(&self, now_ms: u64) -> bool {
        match self.last_publish_ms {
            Some(last) => now_ms.saturating_sub(last) >= self.timing.publish_interval_ms,
            None => true,
        }
    }

    fn publish(&mut self, now_ms: u64) {
        self.last_publish_ms = Some(now_ms);
        self.snapshot.publish(Snapshot {
            readings: Readings::from(&self.state),
            state: self.state.clone(),
            health: self.monitor.health(),
            stale: self.monitor.is_stale(now_ms),
            average_rpm: self.trip.average_rpm(),
            trip: self.trip.clone(),
            frames: self.router.log().iter().rev().map(FrameView::from).collect(),
            frames_total: self.router.frames_routed(),
            frames_unrecognized: self.router.frames_unrecognized(),
            active_modes: self
                .compositor
                .active_modes(&self.state)
                .into_iter()
                .map(String::from)
                .collect(),
            config: self.config,
            brightness: self.brightness,
            uptime_ms: now_ms,
        });
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    pub fn bus_state(&self) -> BusState {
        self.monitor.state()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn frame(&self) -> &LedFrame<LED_COUNT> {
        &self.frame
    }

    pub fn trip(&self) -> &TripStatistics {
        &self.trip
    }

    pub fn transceiver_mut(&mut self) -> &mut T {
        &mut self.transceiver
    }

    pub fn strip(&self) -> &S {
        &self.strip
    }

    /// Self-test, bus start, then cycle until `shutdown` is set.
    ///
    /// Blocks the calling thread; meant for a dedicated thread.
    pub fn run(mut self, shutdown: Arc<AtomicBool>) {
        if let Err(e) = self_test(&mut self.strip, LED_COUNT, |ms| {
            std::thread::sleep(Duration::from_millis(ms))
        }) {
            warn!("LED self-test failed: {}", e);
        }

        // The loop clock continues where the self-test clock stopped so the
        // strip never sees time go backwards
        let epoch = Instant::now();
        let clock = || SELF_TEST_DURATION_MS + epoch.elapsed().as_millis() as u64;
        if let Err(e) = self.start(clock()) {
            warn!("CAN start skipped: {}", e);
        }

        let pause = Duration::from_millis(self.timing.cycle_interval_ms);
        info!("Control loop running");
        while !shutdown.load(Ordering::Relaxed) {
            let now_ms = clock();
            self.cycle(now_ms);
            std::thread::sleep(pause);
        }
        info!("Control loop stopped");
    }
}

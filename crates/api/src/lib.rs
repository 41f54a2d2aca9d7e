//! CAN LED Controller API Server
//!
//! Runs the control loop on a dedicated thread and serves its published
//! snapshot over REST. Configuration changes travel back to the loop through
//! a command channel; handlers never touch loop-owned state directly.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use can_bus::{BusHealth, BusState, SimulatedTransceiver, Transceiver};
use controller::{ConfigError, ControlCommand, Controller, DemoTransceiver, SnapshotHandle};
use led_compositor::{LedStrip, SerialStreamStrip};
use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use thiserror::Error;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

pub mod rate_limit;
mod routes;
pub mod settings;

use rate_limit::{create_governor_config, limited, RateLimitConfig};
pub use settings::{AppConfig, HttpConfig};

/// Pending commands before handlers start waiting on the loop
const COMMAND_QUEUE_DEPTH: usize = 16;

/// Errors that stop the binary
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid runtime configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("Unknown log level: {0}")]
    InvalidLogLevel(String),

    #[error("Logging already initialised: {0}")]
    Logging(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Control loop panicked")]
    ControlLoopPanicked,
}

/// Errors returned to HTTP clients
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),

    #[error("Control loop is not running")]
    LoopUnavailable,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
            ApiError::LoopUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        };
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Application state shared across handlers
pub struct AppState {
    /// Latest snapshot published by the control loop
    pub snapshot: SnapshotHandle,
    /// Command channel into the control loop
    pub commands: mpsc::Sender<ControlCommand>,
    /// Prometheus renderer, absent when no recorder was installed
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Create new application state
    pub fn new(
        snapshot: SnapshotHandle,
        commands: mpsc::Sender<ControlCommand>,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            snapshot,
            commands,
            metrics,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }

    /// Hand a command to the control loop
    pub async fn send(&self, command: ControlCommand) -> Result<(), ApiError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ApiError::LoopUnavailable)
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` while the bus runs and data is fresh, otherwise `degraded`
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub bus: BusHealth,
    pub stale: bool,
    pub frames_total: u64,
}

/// Create the application router
pub fn create_router(state: SharedState, rate_limit: &RateLimitConfig) -> Router {
    let governor = create_governor_config(rate_limit);

    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/state", get(routes::state::get_state))
        .route("/api/v1/stats", get(routes::stats::get_stats))
        .route(
            "/api/v1/stats/reset",
            limited(post(routes::stats::reset_stats), governor.as_ref()),
        )
        .route("/api/v1/frames", get(routes::frames::get_frames))
        .route(
            "/api/v1/config",
            get(routes::config::get_config).merge(limited(
                post(routes::config::update_config),
                governor.as_ref(),
            )),
        )
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let response = state.snapshot.with(|s| {
        let healthy = s.health.state == BusState::Running && !s.stale;
        HealthResponse {
            status: if healthy { "healthy" } else { "degraded" }.to_string(),
            timestamp,
            version: state.version.clone(),
            uptime_seconds: state.start_time.elapsed().as_secs(),
            bus: s.health.clone(),
            stale: s.stale,
            frames_total: s.frames_total,
        }
    });

    Json(response)
}

/// Prometheus exposition, refreshing the snapshot gauges first
async fn metrics_handler(State(state): State<SharedState>) -> Response {
    let Some(handle) = &state.metrics else {
        return (StatusCode::NOT_FOUND, "Metrics recorder not installed").into_response();
    };

    state.snapshot.with(|s| {
        gauge!("canled_rpm").set(s.state.rpm as f64);
        gauge!("canled_brightness").set(s.brightness as f64);
        gauge!("canled_stale").set(if s.stale { 1.0 } else { 0.0 });
        let running = s.health.state == BusState::Running;
        gauge!("canled_bus_running").set(if running { 1.0 } else { 0.0 });
    });
    handle.render().into_response()
}

/// Initialize logging to stderr; stdout is reserved for the LED stream
pub fn init_logging(level: &str, json: bool) -> Result<(), AppError> {
    let level: Level = level
        .parse()
        .map_err(|_| AppError::InvalidLogLevel(level.to_string()))?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

/// Start the control loop thread with the configured bus source and LED output
fn spawn_controller(
    config: &AppConfig,
    snapshot: SnapshotHandle,
    commands: mpsc::Receiver<ControlCommand>,
    shutdown: Arc<AtomicBool>,
) -> io::Result<JoinHandle<()>> {
    let runtime = config.runtime;
    if config.demo_mode {
        let transceiver = DemoTransceiver::new(runtime.protocol, runtime.rpm_redline);
        with_strip(transceiver, config, snapshot, commands, shutdown)
    } else {
        warn!("No CAN hardware backend in this build; the bus will stay idle");
        with_strip(SimulatedTransceiver::new(), config, snapshot, commands, shutdown)
    }
}

fn with_strip<T>(
    transceiver: T,
    config: &AppConfig,
    snapshot: SnapshotHandle,
    commands: mpsc::Receiver<ControlCommand>,
    shutdown: Arc<AtomicBool>,
) -> io::Result<JoinHandle<()>>
where
    T: Transceiver + Send + 'static,
{
    if config.led_stream {
        let strip = SerialStreamStrip::new(io::stdout());
        launch(transceiver, strip, config, snapshot, commands, shutdown)
    } else {
        let strip = SerialStreamStrip::new(io::sink());
        launch(transceiver, strip, config, snapshot, commands, shutdown)
    }
}

fn launch<T, S>(
    transceiver: T,
    strip: S,
    config: &AppConfig,
    snapshot: SnapshotHandle,
    commands: mpsc::Receiver<ControlCommand>,
    shutdown: Arc<AtomicBool>,
) -> io::Result<JoinHandle<()>>
where
    T: Transceiver + Send + 'static,
    S: LedStrip + Send + 'static,
{
    let controller = Controller::new(transceiver, strip, config.controller_settings())
        .with_snapshot(snapshot)
        .with_commands(commands);

    std::thread::Builder::new()
        .name("control-loop".to_string())
        .spawn(move || controller.run(shutdown))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown requested");
}

/// Run the controller and the API server until Ctrl-C
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    config.runtime.validate()?;

    let metrics = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Prometheus recorder not installed: {}", e);
            None
        }
    };

    let snapshot = SnapshotHandle::new();
    let (commands, receiver) = mpsc::channel(COMMAND_QUEUE_DEPTH);
    let shutdown = Arc::new(AtomicBool::new(false));

    info!(
        "Protocol {}, redline {} RPM, demo mode {}, LED stream {}",
        config.runtime.protocol, config.runtime.rpm_redline, config.demo_mode, config.led_stream
    );
    let worker = spawn_controller(&config, snapshot.clone(), receiver, Arc::clone(&shutdown))?;

    let state = Arc::new(AppState::new(snapshot, commands, metrics));
    let app = create_router(state, &config.http.rate_limit);

    info!("Starting API server on {}", config.http.addr);
    let listener = tokio::net::TcpListener::bind(&config.http.addr).await?;
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    shutdown.store(true, Ordering::Relaxed);
    let joined = tokio::task::spawn_blocking(move || worker.join()).await;
    served?;
    match joined {
        Ok(Ok(())) => Ok(()),
        _ => Err(AppError::ControlLoopPanicked),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use controller::{ConfigUpdate, FrameView, Snapshot};
    use serde_json::Value;
    use tower::ServiceExt;

    fn build_app(
        snapshot: Snapshot,
        rate_limit: RateLimitConfig,
    ) -> (Router, mpsc::Receiver<ControlCommand>) {
        let handle = SnapshotHandle::new();
        handle.publish(snapshot);
        let (tx, rx) = mpsc::channel(4);
        let state = Arc::new(AppState::new(handle, tx, None));
        (create_router(state, &rate_limit), rx)
    }

    fn running_snapshot() -> Snapshot {
        let mut snapshot = Snapshot::default();
        snapshot.health.state = BusState::Running;
        snapshot.state.set_rpm(4200);
        snapshot.frames_total = 3;
        snapshot.frames = (0..3u32)
            .rev()
            .map(|i| FrameView {
                timestamp_ms: i as u64 * 10,
                id: 0x100 + i,
                extended: false,
                len: 0,
                data: Vec::new(),
                text: format!("ID 0x{:X} DLC0 DATA", 0x100 + i),
            })
            .collect();
        snapshot
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn post_json(app: &Router, uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_health_reflects_bus() {
        let (app, _rx) = build_app(Snapshot::default(), RateLimitConfig::default());
        let (status, body) = get_json(&app, "/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["bus"]["state"], "stopped");

        let (app, _rx) = build_app(running_snapshot(), RateLimitConfig::default());
        let (_, body) = get_json(&app, "/api/v1/health").await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["frames_total"], 3);
    }

    #[tokio::test]
    async fn test_state_endpoint() {
        let (app, _rx) = build_app(running_snapshot(), RateLimitConfig::default());
        let (status, body) = get_json(&app, "/api/v1/state").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"]["rpm"], 4200);
        assert_eq!(body["readings"]["coolant_c"], "60.0");
    }

    #[tokio::test]
    async fn test_frames_limit() {
        let (app, _rx) = build_app(running_snapshot(), RateLimitConfig::default());
        let (_, body) = get_json(&app, "/api/v1/frames?limit=2").await;
        assert_eq!(body["count"], 2);
        assert_eq!(body["total"], 3);
        assert_eq!(body["data"][0]["id"], 0x102);

        let (_, body) = get_json(&app, "/api/v1/frames").await;
        assert_eq!(body["count"], 3);
    }

    #[tokio::test]
    async fn test_config_update_queued() {
        let (app, mut rx) = build_app(Snapshot::default(), RateLimitConfig::default());
        let (status, body) = get_json(&app, "/api/v1/config").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rpm_redline"], 6500);

        let (status, body) = post_json(&app, "/api/v1/config", r#"{"rpm_redline": 8000}"#).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["rpm_redline"], 8000);
        assert_eq!(
            rx.try_recv().unwrap(),
            ControlCommand::UpdateConfig(ConfigUpdate {
                rpm_redline: Some(8000),
                ..ConfigUpdate::default()
            })
        );
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let (app, mut rx) = build_app(Snapshot::default(), RateLimitConfig::default());
        let (status, body) = post_json(&app, "/api/v1/config", r#"{"rpm_redline": 500}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("500"));

        let (status, _) = post_json(&app, "/api/v1/config", r#"{"brightness": 5}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // the protocol is fixed at startup
        let (status, _) = post_json(&app, "/api/v1/config", r#"{"protocol": "custom"}"#).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_empty_update_not_queued() {
        let (app, mut rx) = build_app(Snapshot::default(), RateLimitConfig::default());
        let (status, _) = post_json(&app, "/api/v1/config", "{}").await;
        assert_eq!(status, StatusCode::OK);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stats_reset() {
        let (app, mut rx) = build_app(running_snapshot(), RateLimitConfig::default());
        let (status, body) = get_json(&app, "/api/v1/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["frames_total"], 3);

        let (status, _) = post_json(&app, "/api/v1/stats/reset", "").await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(rx.try_recv().unwrap(), ControlCommand::ResetTrip);
    }

    #[tokio::test]
    async fn test_loop_unavailable() {
        let (app, rx) = build_app(Snapshot::default(), RateLimitConfig::default());
        drop(rx);
        let (status, _) = post_json(&app, "/api/v1/stats/reset", "").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_mutations_rate_limited() {
        let strict = RateLimitConfig {
            enabled: true,
            per_second: 60,
            burst_size: 1,
        };
        let (app, _rx) = build_app(Snapshot::default(), strict);
        let (status, _) = post_json(&app, "/api/v1/stats/reset", "").await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let (status, _) = post_json(&app, "/api/v1/config", r#"{"brightness": 90}"#).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

        // reads are never limited
        let (status, _) = get_json(&app, "/api/v1/config").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_without_recorder() {
        let (app, _rx) = build_app(Snapshot::default(), RateLimitConfig::default());
        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

//! Application configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `CANLED_*` environment variables (`__` separates nesting, e.g.
//! `CANLED_RUNTIME__NIGHT_START_HOUR=21`).

use crate::rate_limit::RateLimitConfig;
use can_bus::{BusConfig, HealthConfig};
use config::{Config, Environment, File};
use controller::{ControllerSettings, RuntimeConfig, TimingConfig};
use serde::{Deserialize, Serialize};

/// Default configuration file, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "canled.toml";

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub addr: String,
    /// Applied to the mutating endpoints only
    pub rate_limit: RateLimitConfig,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".to_string(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Top-level configuration for the `canled` binary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub runtime: RuntimeConfig,
    pub bus: BusConfig,
    pub health: HealthConfig,
    pub timing: TimingConfig,
    pub http: HttpConfig,
    /// Feed a simulated drive through the decoder instead of a live bus
    pub demo_mode: bool,
    /// Write `LED:` stream lines to stdout
    pub led_stream: bool,
    pub log_level: String,
    pub log_json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            runtime: RuntimeConfig::default(),
            bus: BusConfig::default(),
            health: HealthConfig::default(),
            timing: TimingConfig::default(),
            http: HttpConfig::default(),
            demo_mode: true,
            led_stream: false,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl AppConfig {
    /// Load defaults, then `path` (or [`DEFAULT_CONFIG_FILE`]) if present,
    /// then the environment.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let file = path.unwrap_or(DEFAULT_CONFIG_FILE);
        Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::with_name(file).required(path.is_some()))
            .add_source(
                Environment::with_prefix("CANLED")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            runtime: self.runtime,
            bus: self.bus.clone(),
            health: self.health,
            timing: self.timing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use can_protocol::ProtocolVariant;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.runtime.rpm_redline, 6500);
        assert_eq!(config.http.addr, "0.0.0.0:8080");
        assert_eq!(config.timing.drain.max_frames, 5);
        assert!(config.demo_mode);
    }

    #[test]
    fn test_environment_overrides() {
        // only keys no other test asserts on; tests share the process env
        std::env::set_var("CANLED_RUNTIME__NIGHT_START_HOUR", "21");
        std::env::set_var("CANLED_HEALTH__STALE_AFTER_MS", "3500");
        let config = AppConfig::load(None);
        std::env::remove_var("CANLED_RUNTIME__NIGHT_START_HOUR");
        std::env::remove_var("CANLED_HEALTH__STALE_AFTER_MS");

        let config = config.unwrap();
        assert_eq!(config.runtime.night_start_hour, 21);
        assert_eq!(config.health.stale_after_ms, 3500);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        assert!(AppConfig::load(Some("/nonexistent/canled-test.toml")).is_err());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let path = std::env::temp_dir().join("canled-settings-test.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "demo_mode = false\n\n[runtime]\nprotocol = \"custom\"\nrpm_redline = 8000\nshift_light_rpm = 7600\n\n[http]\naddr = \"127.0.0.1:9000\""
        )
        .unwrap();

        let config = AppConfig::load(path.to_str()).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(!config.demo_mode);
        assert_eq!(config.runtime.protocol, ProtocolVariant::Custom);
        assert_eq!(config.runtime.rpm_redline, 8000);
        assert_eq!(config.runtime.shift_light_rpm, 7600);
        // untouched keys keep their defaults
        assert_eq!(config.runtime.brightness, 128);
        assert_eq!(config.http.addr, "127.0.0.1:9000");
        assert_eq!(config.controller_settings().runtime.rpm_redline, 8000);
    }
}

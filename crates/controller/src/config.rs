//! Runtime configuration and validated partial updates

use can_protocol::ProtocolVariant;
use led_compositor::{BrightnessPolicy, RenderConfig};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use thiserror::Error;

pub const REDLINE_RANGE: RangeInclusive<u16> = 1000..=12000;
pub const BRIGHTNESS_RANGE: RangeInclusive<u8> = 10..=255;

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Redline {0} RPM outside 1000-12000")]
    RedlineOutOfRange(u16),

    #[error("Shift light {shift} RPM above redline {redline} RPM")]
    ShiftAboveRedline { shift: u16, redline: u16 },

    #[error("Brightness {0} outside 10-255")]
    BrightnessOutOfRange(u8),

    #[error("Night brightness {0} outside 10-255")]
    NightBrightnessOutOfRange(u8),

    #[error("Hour {0} is not a valid hour of day")]
    InvalidHour(u8),
}

/// User-adjustable settings applied by the control loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub protocol: ProtocolVariant,
    pub rpm_redline: u16,
    pub shift_light_rpm: u16,
    pub brightness: u8,
    pub night_brightness: u8,
    pub night_start_hour: u8,
    pub night_end_hour: u8,
    pub auto_night_mode: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            protocol: ProtocolVariant::default(),
            rpm_redline: 6500,
            shift_light_rpm: default_shift_rpm(6500),
            brightness: 128,
            night_brightness: 42,
            night_start_hour: 20,
            night_end_hour: 6,
            auto_night_mode: false,
        }
    }
}

/// 95 % of the redline
pub fn default_shift_rpm(redline: u16) -> u16 {
    (redline as u32 * 95 / 100) as u16
}

impl RuntimeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !REDLINE_RANGE.contains(&self.rpm_redline) {
            return Err(ConfigError::RedlineOutOfRange(self.rpm_redline));
        }
        if self.shift_light_rpm > self.rpm_redline {
            return Err(ConfigError::ShiftAboveRedline {
                shift: self.shift_light_rpm,
                redline: self.rpm_redline,
            });
        }
        if !BRIGHTNESS_RANGE.contains(&self.brightness) {
            return Err(ConfigError::BrightnessOutOfRange(self.brightness));
        }
        if !BRIGHTNESS_RANGE.contains(&self.night_brightness) {
            return Err(ConfigError::NightBrightnessOutOfRange(self.night_brightness));
        }
        for hour in [self.night_start_hour, self.night_end_hour] {
            if hour >= 24 {
                return Err(ConfigError::InvalidHour(hour));
            }
        }
        Ok(())
    }

    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            redline_rpm: self.rpm_redline,
            shift_rpm: self.shift_light_rpm,
        }
    }

    pub fn brightness_policy(&self) -> BrightnessPolicy {
        BrightnessPolicy {
            day: self.brightness,
            night: self.night_brightness,
            night_start_hour: self.night_start_hour,
            night_end_hour: self.night_end_hour,
            auto_night_mode: self.auto_night_mode,
        }
    }
}

/// Partial configuration change; absent fields keep their value.
///
/// The wire protocol is fixed at startup and cannot be changed here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigUpdate {
    pub rpm_redline: Option<u16>,
    pub shift_light_rpm: Option<u16>,
    pub brightness: Option<u8>,
    pub night_brightness: Option<u8>,
    pub night_start_hour: Option<u8>,
    pub night_end_hour: Option<u8>,
    pub auto_night_mode: Option<bool>,
}

impl ConfigUpdate {
    pub fn is_empty(&self) -> bool {
        *self == ConfigUpdate::default()
    }

    /// Merge into `current` and validate the result.
    ///
    /// A new redline without an explicit shift point moves the shift point
    /// to 95 % of the new redline when the old one would exceed it.
    pub fn apply_to(&self, current: &RuntimeConfig) -> Result<RuntimeConfig, ConfigError> {
        let mut next = *current;

        if let Some(redline) = self.rpm_redline {
            next.rpm_redline = redline;
            if self.shift_light_rpm.is_none() && next.shift_light_rpm > redline {
                next.shift_light_rpm = default_shift_rpm(redline);
            }
        }
        if let Some(shift) = self.shift_light_rpm {
            next.shift_light_rpm = shift;
        }
        if let Some(brightness) = self.brightness {
            next.brightness = brightness;
        }
        if let Some(night) = self.night_brightness {
            next.night_brightness = night;
        }
        if let Some(hour) = self.night_start_hour {
            next.night_start_hour = hour;
        }
        if let Some(hour) = self.night_end_hour {
            next.night_end_hour = hour;
        }
        if let Some(auto) = self.auto_night_mode {
            next.auto_night_mode = auto;
        }

        next.validate()?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RuntimeConfig::default();
        assert_eq!(config.shift_light_rpm, 6175);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_redline_bounds() {
        let config = RuntimeConfig::default();
        for (redline, ok) in [(999, false), (1000, true), (12000, true), (12001, false)] {
            let update = ConfigUpdate {
                rpm_redline: Some(redline),
                ..ConfigUpdate::default()
            };
            assert_eq!(update.apply_to(&config).is_ok(), ok, "redline {}", redline);
        }
    }

    #[test]
    fn test_brightness_bounds() {
        let config = RuntimeConfig::default();
        let low = ConfigUpdate {
            brightness: Some(9),
            ..ConfigUpdate::default()
        };
        assert_eq!(low.apply_to(&config), Err(ConfigError::BrightnessOutOfRange(9)));

        let ok = ConfigUpdate {
            brightness: Some(10),
            ..ConfigUpdate::default()
        };
        assert_eq!(ok.apply_to(&config).map(|c| c.brightness), Ok(10));
    }

    #[test]
    fn test_lower_redline_moves_shift_point() {
        let config = RuntimeConfig::default();
        let update = ConfigUpdate {
            rpm_redline: Some(4000),
            ..ConfigUpdate::default()
        };
        let next = update.apply_to(&config).unwrap();
        assert_eq!(next.shift_light_rpm, 3800);
    }

    #[test]
    fn test_explicit_shift_above_redline_rejected() {
        let config = RuntimeConfig::default();
        let update = ConfigUpdate {
            rpm_redline: Some(4000),
            shift_light_rpm: Some(4500),
            ..ConfigUpdate::default()
        };
        assert_eq!(
            update.apply_to(&config),
            Err(ConfigError::ShiftAboveRedline {
                shift: 4500,
                redline: 4000
            })
        );
    }

    #[test]
    fn test_hours() {
        let config = RuntimeConfig::default();
        let bad_hour = ConfigUpdate {
            night_end_hour: Some(24),
            ..ConfigUpdate::default()
        };
        assert_eq!(bad_hour.apply_to(&config), Err(ConfigError::InvalidHour(24)));

        let wrap = ConfigUpdate {
            night_start_hour: Some(22),
            night_end_hour: Some(5),
            auto_night_mode: Some(true),
            ..ConfigUpdate::default()
        };
        let next = wrap.apply_to(&config).unwrap();
        assert!(next.brightness_policy().is_night(23));
        assert_eq!(next.brightness_policy().brightness_at(3), 42);
    }

    #[test]
    fn test_update_from_json() {
        let update: ConfigUpdate = serde_json::from_str(r#"{"rpm_redline": 8000}"#).unwrap();
        assert_eq!(update.rpm_redline, Some(8000));
        assert!(!update.is_empty());
        assert!(ConfigUpdate::default().is_empty());
    }
}

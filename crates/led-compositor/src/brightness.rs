//! Global brightness with an optional night-mode window

use chrono::{Local, Timelike};
use serde::{Deserialize, Serialize};

/// How often brightness is re-evaluated against the clock
pub const BRIGHTNESS_REFRESH_MS: u64 = 60_000;

/// Day/night brightness selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrightnessPolicy {
    pub day: u8,
    pub night: u8,
    /// First night hour (0-23, local time)
    pub night_start_hour: u8,
    /// First day hour after the night window
    pub night_end_hour: u8,
    pub auto_night_mode: bool,
}

impl Default for BrightnessPolicy {
    fn default() -> Self {
        Self {
            day: 128,
            night: 42,
            night_start_hour: 20,
            night_end_hour: 6,
            auto_night_mode: false,
        }
    }
}

impl BrightnessPolicy {
    /// Whether `hour` falls in `[start, end)`, wrapping past midnight
    pub fn is_night(&self, hour: u8) -> bool {
        let (start, end) = (self.night_start_hour, self.night_end_hour);
        if start > end {
            hour >= start || hour < end
        } else {
            hour >= start && hour < end
        }
    }

    pub fn brightness_at(&self, hour: u8) -> u8 {
        if self.auto_night_mode && self.is_night(hour) {
            self.night
        } else {
            self.day
        }
    }

    /// Brightness for the current local hour
    pub fn current(&self) -> u8 {
        if !self.auto_night_mode {
            return self.day;
        }
        self.brightness_at(Local::now().hour() as u8)
    }
}

/// Tracks when brightness was last pushed to the strip
#[derive(Debug, Clone, Default)]
pub struct BrightnessSchedule {
    last_applied_ms: Option<u64>,
}

impl BrightnessSchedule {
    /// True on the first call and once per refresh interval after that
    pub fn due(&mut self, now_ms: u64) -> bool {
        match self.last_applied_ms {
            Some(last) if now_ms.saturating_sub(last) < BRIGHTNESS_REFRESH_MS => false,
            _ => {
                self.last_applied_ms = Some(now_ms);
                true
            }
        }
    }

    /// Force re-application on the next cycle (config change)
    pub fn invalidate(&mut self) {
        self.last_applied_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_wraps_midnight() {
        let policy = BrightnessPolicy {
            auto_night_mode: true,
            ..BrightnessPolicy::default()
        };
        assert!(policy.is_night(20));
        assert!(policy.is_night(23));
        assert!(policy.is_night(0));
        assert!(policy.is_night(5));
        assert!(!policy.is_night(6));
        assert!(!policy.is_night(19));
        assert_eq!(policy.brightness_at(2), 42);
        assert_eq!(policy.brightness_at(12), 128);
    }

    #[test]
    fn test_window_within_day() {
        let policy = BrightnessPolicy {
            night_start_hour: 1,
            night_end_hour: 5,
            auto_night_mode: true,
            ..BrightnessPolicy::default()
        };
        assert!(!policy.is_night(0));
        assert!(policy.is_night(1));
        assert!(!policy.is_night(5));
    }

    #[test]
    fn test_manual_mode_ignores_clock() {
        let policy = BrightnessPolicy::default();
        assert_eq!(policy.brightness_at(2), 128);
        assert_eq!(policy.current(), 128);
    }

    #[test]
    fn test_schedule() {
        let mut schedule = BrightnessSchedule::default();
        assert!(schedule.due(0));
        assert!(!schedule.due(59_999));
        assert!(schedule.due(60_000));
        schedule.invalidate();
        assert!(schedule.due(60_001));
    }
}

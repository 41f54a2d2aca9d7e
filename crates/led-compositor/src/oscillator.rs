//! Time-based animation waves
//!
//! Every wave is a pure function of the render timestamp, so a frame can be
//! reproduced exactly by rendering the same inputs at the same `now_ms`.

use std::f64::consts::TAU;

/// Sinusoid oscillating between `low` and `high`, `bpm` cycles per minute
/// (the FastLED `beatsin8` convention).
///
/// Starts at `low` when `now_ms` is zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wave {
    pub bpm: f64,
    pub low: u8,
    pub high: u8,
}

impl Wave {
    pub const fn new(bpm: f64, low: u8, high: u8) -> Self {
        Self { bpm, low, high }
    }

    /// Length of one full cycle
    pub fn period_ms(&self) -> f64 {
        60_000.0 / self.bpm
    }

    pub fn sample(&self, now_ms: u64) -> u8 {
        let (low, high) = if self.low <= self.high {
            (self.low, self.high)
        } else {
            (self.high, self.low)
        };
        let phase = (now_ms as f64 * self.bpm / 60_000.0).fract();
        let unit = (1.0 - (TAU * phase).cos()) / 2.0;
        let span = (high - low) as f64;
        (low as f64 + unit * span).round() as u8
    }
}

/// Square toggle: `true` for the first half of each period
pub fn square(now_ms: u64, half_period_ms: u64) -> bool {
    if half_period_ms == 0 {
        return true;
    }
    (now_ms / half_period_ms) % 2 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wave_extremes() {
        let wave = Wave::new(60.0, 0, 255);
        assert_eq!(wave.period_ms(), 1000.0);
        assert_eq!(wave.sample(0), 0);
        assert_eq!(wave.sample(500), 255);
        assert_eq!(wave.sample(1000), 0);
        assert!((127..=128).contains(&wave.sample(250)));
    }

    #[test]
    fn test_wave_stays_in_bounds() {
        let wave = Wave::new(5.0, 64, 255);
        for t in (0..30_000).step_by(7) {
            let v = wave.sample(t);
            assert!((64..=255).contains(&v), "sample {} at {}", v, t);
        }
    }

    #[test]
    fn test_wave_is_deterministic() {
        let wave = Wave::new(6.0, 40, 120);
        assert_eq!(wave.sample(123_456), wave.sample(123_456));
    }

    #[test]
    fn test_square() {
        assert!(square(0, 200));
        assert!(square(199, 200));
        assert!(!square(200, 200));
        assert!(square(400, 200));
    }
}

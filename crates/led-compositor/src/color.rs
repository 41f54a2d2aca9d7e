//! 8-bit color math compatible with the FastLED conventions

use serde::{Deserialize, Serialize};
use std::fmt;

/// 24-bit RGB pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const RED: Rgb = Rgb::new(255, 0, 0);
    /// HTML green, as used by the LED palette
    pub const GREEN: Rgb = Rgb::new(0, 128, 0);
    pub const BLUE: Rgb = Rgb::new(0, 0, 255);
    pub const YELLOW: Rgb = Rgb::new(255, 255, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Dim every channel, never turning a lit channel fully off
    pub fn scale_video(self, scale: u8) -> Self {
        Self {
            r: nscale8_video(self.r, scale),
            g: nscale8_video(self.g, scale),
            b: nscale8_video(self.b, scale),
        }
    }

    /// Mix towards `other` by `amount` / 255
    pub fn blend(self, other: Rgb, amount: u8) -> Self {
        Self {
            r: blend8(self.r, other.r, amount),
            g: blend8(self.g, other.g, amount),
            b: blend8(self.b, other.b, amount),
        }
    }

    pub fn is_black(self) -> bool {
        self == Rgb::BLACK
    }
}

impl fmt::Display for Rgb {
    /// Upper-case `RRGGBB`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// `value * (scale + 1) / 256`; a scale of 255 is the identity
#[inline]
pub fn scale8(value: u8, scale: u8) -> u8 {
    ((value as u16 * (1 + scale as u16)) >> 8) as u8
}

/// Like [`scale8`], but a non-zero value with non-zero scale stays non-zero
#[inline]
pub fn nscale8_video(value: u8, scale: u8) -> u8 {
    if value == 0 {
        return 0;
    }
    let scaled = ((value as u16 * scale as u16) >> 8) as u8;
    scaled + (scale != 0) as u8
}

/// Linear mix of two channels, `amount` 0 keeps `a`, 255 is (almost) `b`
#[inline]
pub fn blend8(a: u8, b: u8, amount: u8) -> u8 {
    let partial = (((a as u32) << 8) | b as u32) + b as u32 * amount as u32
        - a as u32 * amount as u32;
    (partial >> 8) as u8
}

/// Integer linear re-map of `x` from one range to another
///
/// Truncates towards zero like the Arduino `map` helper. A degenerate input
/// range maps everything to `out_min`.
pub fn map_range(x: i32, in_min: i32, in_max: i32, out_min: i32, out_max: i32) -> i32 {
    if in_max == in_min {
        return out_min;
    }
    (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

/// [`map_range`] clamped into a byte
pub fn map_to_u8(x: i32, in_min: i32, in_max: i32, out_min: u8, out_max: u8) -> u8 {
    map_range(x, in_min, in_max, out_min as i32, out_max as i32).clamp(0, 255) as u8
}

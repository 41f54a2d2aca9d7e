//! Saturating percent type

use serde::{Deserialize, Serialize};

/// A value in `0..=100`.
///
/// Every constructor saturates, so a `Percent` can never hold an
/// out-of-range value no matter what the wire carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Percent(u8);

impl Percent {
    pub const ZERO: Percent = Percent(0);
    pub const FULL: Percent = Percent(100);

    /// Clamp an arbitrary unsigned value into range
    pub fn saturating(value: u32) -> Self {
        Percent(value.min(100) as u8)
    }

    /// Raw value, always `<= 100`
    pub fn get(self) -> u8 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl From<u8> for Percent {
    fn from(value: u8) -> Self {
        Percent::saturating(value as u32)
    }
}

impl From<Percent> for u8 {
    fn from(value: Percent) -> Self {
        value.0
    }
}

impl<'de> Deserialize<'de> for Percent {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u32::deserialize(deserializer).map(Percent::saturating)
    }
}

impl std::fmt::Display for Percent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

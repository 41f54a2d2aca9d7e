//! Precomputed per-strip lookup tables

use crate::color::Rgb;

/// Tables derived once per strip length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTables<const N: usize> {
    /// Lit pixel count for every throttle percent, rounded
    throttle_lit: [u16; 101],
    /// Blue to yellow RPM gradient, one entry per pixel
    rpm_palette: [Rgb; N],
}

impl<const N: usize> Default for LookupTables<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> LookupTables<N> {
    pub fn new() -> Self {
        let throttle_lit =
            std::array::from_fn(|percent| ((percent * N + 50) / 100) as u16);
        let rpm_palette = std::array::from_fn(|i| {
            let ratio = (i * 255 / N.max(1)) as u8;
            Rgb::BLUE.blend(Rgb::YELLOW, ratio)
        });
        Self {
            throttle_lit,
            rpm_palette,
        }
    }

    /// Pixels lit for `percent` throttle (values above 100 saturate)
    pub fn throttle_lit(&self, percent: u8) -> usize {
        self.throttle_lit[percent.min(100) as usize] as usize
    }

    pub fn rpm_color(&self, index: usize) -> Rgb {
        self.rpm_palette
            .get(index)
            .copied()
            .unwrap_or(Rgb::YELLOW)
    }
}

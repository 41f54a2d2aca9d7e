//! Fixed-size pixel frame

use crate::color::Rgb;
use std::ops::Range;

/// One rendered strip image of `N` pixels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedFrame<const N: usize> {
    pixels: [Rgb; N],
}

impl<const N: usize> Default for LedFrame<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> LedFrame<N> {
    pub const LEN: usize = N;

    pub fn new() -> Self {
        Self {
            pixels: [Rgb::BLACK; N],
        }
    }

    pub fn clear(&mut self) {
        self.fill(Rgb::BLACK);
    }

    pub fn fill(&mut self, color: Rgb) {
        self.pixels = [color; N];
    }

    /// Set one pixel; indices past the end are ignored
    pub fn set(&mut self, index: usize, color: Rgb) {
        if let Some(pixel) = self.pixels.get_mut(index) {
            *pixel = color;
        }
    }

    pub fn get(&self, index: usize) -> Option<Rgb> {
        self.pixels.get(index).copied()
    }

    /// Set every pixel in `range`, clamped to the strip
    pub fn fill_range(&mut self, range: Range<usize>, color: Rgb) {
        for pixel in &mut self.pixels[clamp(range, N)] {
            *pixel = color;
        }
    }

    /// Blend `color` over every pixel in `range`, clamped to the strip
    pub fn blend_range(&mut self, range: Range<usize>, color: Rgb, amount: u8) {
        for pixel in &mut self.pixels[clamp(range, N)] {
            *pixel = pixel.blend(color, amount);
        }
    }

    pub fn blend_all(&mut self, color: Rgb, amount: u8) {
        self.blend_range(0..N, color, amount);
    }

    pub fn pixels(&self) -> &[Rgb; N] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [Rgb; N] {
        &mut self.pixels
    }

    /// Number of non-black pixels
    pub fn lit_count(&self) -> usize {
        self.pixels.iter().filter(|p| !p.is_black()).count()
    }
}

fn clamp(range: Range<usize>, len: usize) -> Range<usize> {
    let end = range.end.min(len);
    range.start.min(end)..end
}

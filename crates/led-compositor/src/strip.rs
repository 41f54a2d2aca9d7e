//! LED hardware capability and its implementations

use crate::color::Rgb;
use std::fmt::Write as _;
use std::io::Write;
use thiserror::Error;
use tracing::{debug, info};

/// Minimum time between two stream lines (~30 Hz)
pub const STREAM_INTERVAL_MS: u64 = 33;
/// Hold time of each self-test step
pub const SELF_TEST_STEP_MS: u64 = 150;
/// Self-test length on the strip's clock; callers start their clock here
pub const SELF_TEST_DURATION_MS: u64 = 4 * SELF_TEST_STEP_MS;

#[derive(Debug, Error)]
pub enum StripError {
    #[error("LED output failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Addressable LED strip
pub trait LedStrip {
    /// Show `pixels`; `now_ms` lets slow transports drop frames
    fn push(&mut self, pixels: &[Rgb], now_ms: u64) -> Result<(), StripError>;

    fn set_global_brightness(&mut self, brightness: u8);
}

/// Streams frames as text lines for the strip emulator.
///
/// Line format: `LED:<count>:<RRGGBB...>`, raw colors before brightness.
pub struct SerialStreamStrip<W: Write> {
    writer: W,
    last_line_ms: Option<u64>,
    brightness: u8,
    line: String,
}

impl<W: Write> SerialStreamStrip<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            last_line_ms: None,
            brightness: 255,
            line: String::new(),
        }
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Render one stream line, without the trailing newline
pub fn format_stream_line(pixels: &[Rgb]) -> String {
    let mut line = String::with_capacity(8 + pixels.len() * 6);
    write_stream_line(&mut line, pixels);
    line
}

fn write_stream_line(line: &mut String, pixels: &[Rgb]) {
    line.clear();
    // Writing into a String cannot fail
    let _ = write!(line, "LED:{}:", pixels.len());
    for pixel in pixels {
        let _ = write!(line, "{}", pixel);
    }
}

impl<W: Write> LedStrip for SerialStreamStrip<W> {
    fn push(&mut self, pixels: &[Rgb], now_ms: u64) -> Result<(), StripError> {
        if let Some(last) = self.last_line_ms {
            if now_ms.saturating_sub(last) < STREAM_INTERVAL_MS {
                return Ok(());
            }
        }
        self.last_line_ms = Some(now_ms);

        write_stream_line(&mut self.line, pixels);
        self.writer.write_all(self.line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    fn set_global_brightness(&mut self, brightness: u8) {
        if brightness != self.brightness {
            debug!("Stream brightness -> {}", brightness);
        }
        self.brightness = brightness;
    }
}

/// Keeps every pushed frame in memory
#[derive(Debug, Default, Clone)]
pub struct RecordingStrip {
    pub frames: Vec<Vec<Rgb>>,
    pub brightness: Option<u8>,
    pub brightness_changes: usize,
}

impl RecordingStrip {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_frame(&self) -> Option<&[Rgb]> {
        self.frames.last().map(Vec::as_slice)
    }
}

impl LedStrip for RecordingStrip {
    fn push(&mut self, pixels: &[Rgb], _now_ms: u64) -> Result<(), StripError> {
        self.frames.push(pixels.to_vec());
        Ok(())
    }

    fn set_global_brightness(&mut self, brightness: u8) {
        self.brightness = Some(brightness);
        self.brightness_changes += 1;
    }
}

/// Startup sweep: first pixel red, green, blue, then the whole strip black.
///
/// `pause` is called between steps so callers decide whether to sleep.
pub fn self_test<S: LedStrip + ?Sized>(
    strip: &mut S,
    len: usize,
    mut pause: impl FnMut(u64),
) -> Result<(), StripError> {
    let mut pixels = vec![Rgb::BLACK; len];
    let mut now_ms = 0;
    for color in [Rgb::RED, Rgb::GREEN, Rgb::BLUE] {
        if let Some(first) = pixels.first_mut() {
            *first = color;
        }
        strip.push(&pixels, now_ms)?;
        pause(SELF_TEST_STEP_MS);
        now_ms += SELF_TEST_STEP_MS;
    }
    pixels.fill(Rgb::BLACK);
    strip.push(&pixels, now_ms)?;
    pause(SELF_TEST_STEP_MS);
    info!("LED strip self-test complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_line_format() {
        let pixels = [Rgb::new(255, 0, 0), Rgb::new(0, 0x80, 0x0A)];
        assert_eq!(format_stream_line(&pixels), "LED:2:FF000000800A");
    }

    #[test]
    fn test_stream_is_throttled() {
        let mut strip = SerialStreamStrip::new(Vec::new());
        let pixels = [Rgb::BLUE; 3];
        strip.push(&pixels, 0).unwrap();
        strip.push(&pixels, 10).unwrap();
        strip.push(&pixels, 33).unwrap();
        let out = String::from_utf8(strip.into_inner()).unwrap();
        assert_eq!(out, "LED:3:0000FF0000FF0000FF\nLED:3:0000FF0000FF0000FF\n");
    }

    #[test]
    fn test_self_test_sequence() {
        let mut strip = RecordingStrip::new();
        let mut paused = 0;
        self_test(&mut strip, 4, |ms| paused += ms).unwrap();
        let firsts: Vec<Rgb> = strip.frames.iter().map(|f| f[0]).collect();
        assert_eq!(firsts, vec![Rgb::RED, Rgb::GREEN, Rgb::BLUE, Rgb::BLACK]);
        assert!(strip.frames.iter().all(|f| f[1..].iter().all(|p| p.is_black())));
        assert_eq!(paused, SELF_TEST_DURATION_MS);
    }

    #[test]
    fn test_stream_resumes_after_self_test() {
        let mut strip = SerialStreamStrip::new(Vec::new());
        self_test(&mut strip, 2, |_| {}).unwrap();
        strip.push(&[Rgb::WHITE; 2], SELF_TEST_DURATION_MS).unwrap();
        let out = String::from_utf8(strip.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[4], "LED:2:FFFFFFFFFFFF");
    }
}

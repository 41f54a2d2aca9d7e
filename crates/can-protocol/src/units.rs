//! Fixed-point unit conversions
//!
//! Multi-byte wire fields are little-endian and composed with explicit shifts
//! so decoding does not depend on host byte order.

/// Unsigned 16-bit little-endian field at `offset`, `None` if the slice is short
#[inline]
pub fn le_u16(bytes: &[u8], offset: usize) -> Option<u16> {
    let b = bytes.get(offset..offset + 2)?;
    Some(b[0] as u16 | (b[1] as u16) << 8)
}

/// Signed 16-bit little-endian field (two's complement)
#[inline]
pub fn le_i16(bytes: &[u8], offset: usize) -> Option<i16> {
    le_u16(bytes, offset).map(|v| v as i16)
}

/// Unsigned 32-bit little-endian field
#[inline]
pub fn le_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let b = bytes.get(offset..offset + 4)?;
    Some(b[0] as u32 | (b[1] as u32) << 8 | (b[2] as u32) << 16 | (b[3] as u32) << 24)
}

/// Write a 16-bit little-endian field; out-of-range offsets are ignored
#[inline]
pub fn put_le_u16(bytes: &mut [u8], offset: usize, value: u16) {
    if let Some(dst) = bytes.get_mut(offset..offset + 2) {
        dst[0] = value as u8;
        dst[1] = (value >> 8) as u8;
    }
}

/// Write a 32-bit little-endian field; out-of-range offsets are ignored
#[inline]
pub fn put_le_u32(bytes: &mut [u8], offset: usize, value: u32) {
    if let Some(dst) = bytes.get_mut(offset..offset + 4) {
        for (i, byte) in dst.iter_mut().enumerate() {
            *byte = (value >> (8 * i)) as u8;
        }
    }
}

/// Saturating narrow to u16
#[inline]
pub fn saturate_u16(value: u32) -> u16 {
    value.min(u16::MAX as u32) as u16
}

/// Tenths-of-percent to whole percent: truncating divide, then clamp to 100
#[inline]
pub fn tenths_to_percent(raw: u16) -> u8 {
    (raw / 10).min(100) as u8
}

/// `900` -> `"90.0"`
pub fn format_tenths(value: u16) -> String {
    format!("{}.{}", value / 10, value % 10)
}

/// `-25` -> `"-2.5"`
pub fn format_signed_tenths(value: i16) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    format!("{}{}.{}", sign, abs / 10, abs % 10)
}

/// `1400` -> `"14.00"`
pub fn format_hundredths(value: u16) -> String {
    format!("{}.{:02}", value / 100, value % 100)
}

//! CAN Frame Definitions

use crate::error::FrameError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest 11-bit identifier
pub const MAX_STANDARD_ID: u16 = 0x7FF;
/// Largest 29-bit identifier
pub const MAX_EXTENDED_ID: u32 = 0x1FFF_FFFF;

/// CAN identifier, standard (11-bit) or extended (29-bit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CanId {
    Standard(u16),
    Extended(u32),
}

impl CanId {
    /// Validated 11-bit identifier
    pub fn standard(id: u16) -> Result<Self, FrameError> {
        if id > MAX_STANDARD_ID {
            return Err(FrameError::StandardIdOutOfRange(id as u32));
        }
        Ok(CanId::Standard(id))
    }

    /// Validated 29-bit identifier
    pub fn extended(id: u32) -> Result<Self, FrameError> {
        if id > MAX_EXTENDED_ID {
            return Err(FrameError::ExtendedIdOutOfRange(id));
        }
        Ok(CanId::Extended(id))
    }

    /// Numeric identifier value regardless of format
    pub fn raw(&self) -> u32 {
        match *self {
            CanId::Standard(id) => id as u32,
            CanId::Extended(id) => id,
        }
    }

    pub fn is_extended(&self) -> bool {
        matches!(self, CanId::Extended(_))
    }
}

/// One classic CAN data frame as delivered by the transceiver.
///
/// Immutable once built. Bytes past `len` are always zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolFrame {
    id: CanId,
    len: u8,
    data: [u8; 8],
}

impl ProtocolFrame {
    /// Maximum payload of a classic CAN frame
    pub const MAX_LEN: usize = 8;

    /// Build a frame from an identifier and payload
    pub fn new(id: CanId, payload: &[u8]) -> Result<Self, FrameError> {
        if payload.len() > Self::MAX_LEN {
            return Err(FrameError::PayloadTooLong(payload.len()));
        }
        let mut data = [0u8; 8];
        data[..payload.len()].copy_from_slice(payload);
        Ok(Self {
            id,
            len: payload.len() as u8,
            data,
        })
    }

    /// Build a standard-id frame
    pub fn standard(id: u16, payload: &[u8]) -> Result<Self, FrameError> {
        Self::new(CanId::standard(id)?, payload)
    }

    /// Build an extended-id frame
    pub fn extended(id: u32, payload: &[u8]) -> Result<Self, FrameError> {
        Self::new(CanId::extended(id)?, payload)
    }

    /// Encoder-side constructor for identifiers and lengths known to be valid
    pub(crate) fn from_parts(id: CanId, data: [u8; 8], len: usize) -> Self {
        Self {
            id,
            len: len.min(Self::MAX_LEN) as u8,
            data,
        }
    }

    pub fn id(&self) -> CanId {
        self.id
    }

    pub fn raw_id(&self) -> u32 {
        self.id.raw()
    }

    /// Data length code (0-8)
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Payload bytes, exactly `len()` long
    pub fn data(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }
}

impl fmt::Display for ProtocolFrame {
    /// `ID 0x5F0 DLC6 DATA E8 03 00 00 2C 01`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ID 0x{:03X} DLC{} DATA", self.raw_id(), self.len)?;
        for byte in self.data() {
            write!(f, " {:02X}", byte)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_ids() {
        assert_eq!(
            ProtocolFrame::standard(0x800, &[]),
            Err(FrameError::StandardIdOutOfRange(0x800))
        );
        assert!(ProtocolFrame::extended(0x2000_0000, &[]).is_err());
        assert!(ProtocolFrame::extended(0x1FFF_FFFF, &[]).is_ok());
    }

    #[test]
    fn test_rejects_long_payload() {
        assert_eq!(
            ProtocolFrame::standard(0x100, &[0; 9]),
            Err(FrameError::PayloadTooLong(9))
        );
    }

    #[test]
    fn test_payload_is_length_limited() {
        let frame = ProtocolFrame::standard(0x102, &[0xE8, 0x03]).unwrap();
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.data(), &[0xE8, 0x03]);
        assert!(!frame.id().is_extended());
    }

    #[test]
    fn test_display_format() {
        let frame = ProtocolFrame::standard(0x5F0, &[0xE8, 0x03, 0x00, 0x00, 0x2C, 0x01]).unwrap();
        assert_eq!(frame.to_string(), "ID 0x5F0 DLC6 DATA E8 03 00 00 2C 01");

        let empty = ProtocolFrame::standard(0x7, &[]).unwrap();
        assert_eq!(empty.to_string(), "ID 0x007 DLC0 DATA");
    }
}

//! CAN Protocol Error Types

use thiserror::Error;

/// Errors constructing a [`crate::ProtocolFrame`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Identifier does not fit an 11-bit standard id
    #[error("Standard identifier {0:#X} exceeds 0x7FF")]
    StandardIdOutOfRange(u32),

    /// Identifier does not fit a 29-bit extended id
    #[error("Extended identifier {0:#X} exceeds 0x1FFFFFFF")]
    ExtendedIdOutOfRange(u32),

    /// Payload longer than a classic CAN frame allows
    #[error("Payload length {0} exceeds 8 bytes")]
    PayloadTooLong(usize),
}

/// Errors selecting a protocol variant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Name or index does not match any supported protocol
    #[error("Unknown protocol variant: {0}")]
    UnknownVariant(String),
}

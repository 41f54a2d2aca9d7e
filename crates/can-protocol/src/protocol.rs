//! Protocol Variant Selection
//!
//! Each supported dashboard protocol is a [`FrameDecoder`] strategy. The
//! variant is picked once at startup from configuration; variants are never
//! mixed within one running decoder.

use crate::decoders::{CustomDecoder, LinkGeneric2Decoder, LinkGenericDecoder};
use crate::error::ProtocolError;
use crate::frame::ProtocolFrame;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use vehicle_state::VehicleState;

/// Maps raw frames onto [`VehicleState`] fields for one wire protocol.
///
/// `decode` cannot fail: unknown identifiers are ignored and fields whose
/// bytes are missing from a short frame are left untouched.
pub trait FrameDecoder: Send {
    /// Human-readable protocol name
    fn name(&self) -> &'static str;

    /// Whether `id` belongs to this protocol's message set
    fn recognizes(&self, id: u32) -> bool;

    /// Apply one frame to the state
    fn decode(&self, frame: &ProtocolFrame, state: &mut VehicleState);

    /// Encode a state as this protocol's frames (simulation and bench testing)
    fn encode(&self, state: &VehicleState) -> Vec<ProtocolFrame>;
}

/// Supported dashboard protocols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolVariant {
    /// Original custom message set (0x100-0x106)
    Custom,
    /// Link ECU Generic Dashboard (0x5F0-0x5F7)
    LinkGeneric,
    /// Link ECU Generic Dashboard 2 (0x2000-0x2007, extended ids)
    LinkGeneric2,
}

impl ProtocolVariant {
    pub const ALL: [ProtocolVariant; 3] = [
        ProtocolVariant::Custom,
        ProtocolVariant::LinkGeneric,
        ProtocolVariant::LinkGeneric2,
    ];

    /// Build the decoder strategy for this variant
    pub fn decoder(self) -> Box<dyn FrameDecoder> {
        match self {
            ProtocolVariant::Custom => Box::new(CustomDecoder),
            ProtocolVariant::LinkGeneric => Box::new(LinkGenericDecoder),
            ProtocolVariant::LinkGeneric2 => Box::new(LinkGeneric2Decoder),
        }
    }

    /// Numeric selector used by the firmware build flag (0, 1, 2)
    pub fn from_index(index: u8) -> Result<Self, ProtocolError> {
        Self::ALL
            .get(index as usize)
            .copied()
            .ok_or_else(|| ProtocolError::UnknownVariant(index.to_string()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolVariant::Custom => "custom",
            ProtocolVariant::LinkGeneric => "link_generic",
            ProtocolVariant::LinkGeneric2 => "link_generic2",
        }
    }
}

impl Default for ProtocolVariant {
    fn default() -> Self {
        ProtocolVariant::LinkGeneric
    }
}

impl FromStr for ProtocolVariant {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(index) = trimmed.parse::<u8>() {
            return Self::from_index(index);
        }
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ProtocolError::UnknownVariant(s.to_string()))
    }
}

impl std::fmt::Display for ProtocolVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_by_name_and_index() {
        assert_eq!("custom".parse(), Ok(ProtocolVariant::Custom));
        assert_eq!("LINK_GENERIC2".parse(), Ok(ProtocolVariant::LinkGeneric2));
        assert_eq!("1".parse(), Ok(ProtocolVariant::LinkGeneric));
        assert!("3".parse::<ProtocolVariant>().is_err());
        assert!("obd".parse::<ProtocolVariant>().is_err());
    }

    #[test]
    fn test_decoder_names() {
        for variant in ProtocolVariant::ALL {
            assert!(!variant.decoder().name().is_empty());
        }
        assert_eq!(ProtocolVariant::default(), ProtocolVariant::LinkGeneric);
    }
}

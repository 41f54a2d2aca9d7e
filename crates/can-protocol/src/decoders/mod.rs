//! Per-protocol frame decoders

pub mod custom;
pub mod link_generic;
pub mod link_generic2;

pub use custom::CustomDecoder;
pub use link_generic::LinkGenericDecoder;
pub use link_generic2::LinkGeneric2Decoder;

use crate::frame::{CanId, ProtocolFrame};

/// Single bit at `bit` when `set`
#[inline]
fn flag(set: bool, bit: u8) -> u8 {
    (set as u8) << bit
}

/// Ids passed here are protocol constants below 0x800
fn standard_frame(id: u32, data: [u8; 8], len: usize) -> ProtocolFrame {
    ProtocolFrame::from_parts(CanId::Standard(id as u16), data, len)
}

fn extended_frame(id: u32, data: [u8; 8], len: usize) -> ProtocolFrame {
    ProtocolFrame::from_parts(CanId::Extended(id), data, len)
}

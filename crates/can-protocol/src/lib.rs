//! CAN Dashboard Protocol Implementation
//!
//! Frame type, fixed-point unit helpers, and one decoder per supported
//! ECU dashboard protocol. Decoders are pure: a frame goes in, fields of a
//! [`vehicle_state::VehicleState`] are updated, nothing can fail.

mod decoders;
mod error;
mod frame;
mod protocol;
pub mod units;

pub use decoders::{custom, link_generic, link_generic2};
pub use decoders::{CustomDecoder, LinkGeneric2Decoder, LinkGenericDecoder};
pub use error::{FrameError, ProtocolError};
pub use frame::{CanId, ProtocolFrame, MAX_EXTENDED_ID, MAX_STANDARD_ID};
pub use protocol::{FrameDecoder, ProtocolVariant};

//! Fixed-Capacity Ring Buffer
//!
//! Provides an allocation-free circular buffer used for the CAN frame log.

mod buffer;

pub use buffer::RingBuffer;

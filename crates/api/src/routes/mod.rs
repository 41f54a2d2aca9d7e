//! REST handlers

pub mod config;
pub mod frames;
pub mod state;
pub mod stats;

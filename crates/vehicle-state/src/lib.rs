//! Vehicle State Store
//!
//! The canonical fixed-point vehicle record written by the protocol decoder
//! and read by the renderer, plus trip statistics derived from it.

mod percent;
mod state;
mod trip;

pub use percent::Percent;
pub use state::{VehicleState, ENGINE_RUNNING_RPM};
pub use trip::TripStatistics;

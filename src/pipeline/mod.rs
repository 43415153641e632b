//! Tracking pipeline module.
//!
//! Entry points for presentation layers:
//! - `context` - Passenger, staff and system sessions
//! - `tracking` - Identify, describe, transition and import flows

pub mod context;
pub mod tracking;

pub use context::*;
pub use tracking::*;

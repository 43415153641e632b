//! Lifecycle module.
//!
//! - `engine` - Status state machine, self-claim, security handover, escalation
//! - `handover` - Handover verification form
//! - `sla` - SLA risk bands

pub mod engine;
pub mod handover;
pub mod sla;

pub use engine::*;
pub use handover::*;
pub use sla::*;

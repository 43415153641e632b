//! Time sources.
//!
//! Every timestamp the engine writes comes from an injected clock so that
//! SLA bands and update stamps can be driven deterministically.

pub mod source;

pub use source::*;

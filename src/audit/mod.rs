//! Audit module.
//!
//! Security and operations trail for every mutating transition:
//! - `entry` - Entry types and SHA-256 chain hashing
//! - `trail` - Append-only, hash-chained log

pub mod entry;
pub mod trail;

pub use entry::*;
pub use trail::*;

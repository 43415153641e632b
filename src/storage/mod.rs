//! Storage module.
//!
//! Baggage record models and the in-process authoritative record store.
//! The store is the read-after-write source of truth inside this process;
//! the gateway's fallback cache never outranks it.

pub mod models;
pub mod store;

pub use models::*;
pub use store::*;

//! Security module.
//!
//! Masks identity document numbers, phone numbers and emails before they
//! reach log output.

pub mod pii;

pub use pii::*;

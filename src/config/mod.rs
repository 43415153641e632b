//! Configuration module.
//!
//! - `integration` - Remote network connection descriptor (persisted JSON)
//! - `provider` - Injected, live-reloadable access to the descriptor
//! - `settings` - Engine tunables (SLA limit, remote timeout)

pub mod integration;
pub mod provider;
pub mod settings;

pub use integration::*;
pub use provider::*;
pub use settings::*;

//! Identity resolution module.
//!
//! Maps what a passenger supplies to a baggage record:
//! - `identifier` - The four identification forms and their matching rules
//! - `resolver` - Deterministic lookup, unclaimed pool, description filtering
//! - `assistant` - Optional language-assistant capability and keyword fallback

pub mod assistant;
pub mod identifier;
pub mod resolver;

pub use assistant::*;
pub use identifier::*;
pub use resolver::*;

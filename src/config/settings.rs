//! Engine tunables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Remote call bound, in seconds.
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 10;

/// SLA limit, in hours.
pub const DEFAULT_SLA_LIMIT_HOURS: u32 = 24;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub sla_limit_hours: u32,
    pub remote_timeout_secs: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sla_limit_hours: DEFAULT_SLA_LIMIT_HOURS,
            remote_timeout_secs: DEFAULT_REMOTE_TIMEOUT_SECS,
        }
    }
}

impl EngineSettings {
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs)
    }

    pub fn sla_limit(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.sla_limit_hours))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = EngineSettings::default();
        assert_eq!(settings.remote_timeout(), Duration::from_secs(10));
        assert_eq!(settings.sla_limit(), chrono::Duration::hours(24));
    }

    #[test]
    fn test_partial_override() {
        let settings: EngineSettings = serde_json::from_str(r#"{"sla_limit_hours": 48}"#).unwrap();
        assert_eq!(settings.sla_limit_hours, 48);
        assert_eq!(settings.remote_timeout_secs, 10);
    }
}

//! Configuration providers.
//!
//! The gateway holds one provider and reads it on every call, so a toggle
//! made by the settings surface takes effect on the next request.

use parking_lot::RwLock;

use super::integration::IntegrationConfig;

pub trait ConfigProvider: Send + Sync {
    fn integration(&self) -> IntegrationConfig;
}

/// Fixed descriptor.
#[derive(Debug, Clone, Default)]
pub struct StaticConfig(pub IntegrationConfig);

impl ConfigProvider for StaticConfig {
    fn integration(&self) -> IntegrationConfig {
        self.0.clone()
    }
}

/// Descriptor that can be changed at runtime.
#[derive(Debug, Default)]
pub struct LiveConfig {
    current: RwLock<IntegrationConfig>,
}

impl LiveConfig {
    pub fn new(config: IntegrationConfig) -> Self {
        Self {
            current: RwLock::new(config),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.current.write().connected = connected;
        log::info!("INTEGRATION_TOGGLED connected={}", connected);
    }

    pub fn replace(&self, config: IntegrationConfig) {
        log::info!(
            "INTEGRATION_REPLACED connected={} station={} base_url={}",
            config.connected,
            config.station_code,
            config.base_url
        );
        *self.current.write() = config;
    }
}

impl ConfigProvider for LiveConfig {
    fn integration(&self) -> IntegrationConfig {
        self.current.read().clone()
    }
}

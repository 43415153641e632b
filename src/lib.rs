//! Baggage Trace Core - Lost-baggage resolution and resilient synchronization
//!
//! This crate holds the station-side core of the baggage tracing service:
//! passenger identification, the baggage lifecycle with its security
//! handover, and mirroring to the global tracing network. The
//! implementation prioritizes:
//!
//! 1. **Integrity** - Delivered only through a verified handover, hash-chained audit
//! 2. **Logging** - Every decision point logged with operation and PIR context
//! 3. **Resilience** - Remote outages never reach the caller
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `pipeline` - Session context and the tracking service entry points
//! - `resolution` - Identifier parsing, lookup, description matching
//! - `lifecycle` - Status state machine, handover form, SLA bands
//! - `gateway` - Circuit-breaking client for the tracing network
//! - `storage` - Record models and the authoritative in-process store
//! - `audit` - Append-only, hash-chained audit log
//! - `security` - PII masking for log output
//! - `config` - Integration descriptor, live provider, engine settings
//! - `clock` - Injected time sources
//! - `logging` - Structured logging with operation context

use std::sync::Arc;

pub mod audit;
pub mod clock;
pub mod config;
pub mod error;
pub mod gateway;
pub mod lifecycle;
pub mod logging;
pub mod pipeline;
pub mod resolution;
pub mod security;
pub mod storage;

pub use error::{HandoverField, TraceError, TraceResult};

use audit::AuditLog;
use clock::{Clock, SystemClock};
use config::{ConfigProvider, EngineSettings};
use gateway::{FallbackCache, HttpTransport, OfflineTransport, RemoteGateway, Transport};
use pipeline::tracking::TrackingService;
use resolution::{IdentityResolver, KeywordMatcher};
use storage::{BaggageRecord, DataSource, RecordStore};

/// Initialize the process-wide logger. Safe to call more than once.
///
/// Defaults to `info`; `RUST_LOG` overrides.
pub fn init_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

/// Wire a tracking service for one station.
///
/// Uses the system clock, the seeded simulation cache, the keyword matcher
/// for description search, and an HTTP transport bounded by
/// `settings.remote_timeout()`. `records` is the initial import.
pub fn build_station_service(
    config: Arc<dyn ConfigProvider>,
    settings: EngineSettings,
    source: DataSource,
    records: Vec<BaggageRecord>,
) -> TraceResult<TrackingService> {
    init_logger();

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let transport: Arc<dyn Transport> = match HttpTransport::new(settings.remote_timeout()) {
        Ok(http) => Arc::new(http),
        Err(e) => {
            log::error!("HTTP_TRANSPORT_UNAVAILABLE error={} fallback=offline", e);
            Arc::new(OfflineTransport)
        }
    };

    let gateway = RemoteGateway::new(
        config,
        transport,
        Arc::new(FallbackCache::seeded(clock.now())),
        Arc::clone(&clock),
    )
    .with_timeout(settings.remote_timeout());

    let store = RecordStore::new(Arc::clone(&clock), source);
    let loaded = store.load(records)?;

    log::info!(
        "STATION_SERVICE_READY records={} source={:?} sla_limit_hours={} remote_timeout_secs={}",
        loaded,
        source,
        settings.sla_limit_hours,
        settings.remote_timeout_secs
    );

    Ok(TrackingService::new(
        Arc::new(store),
        Arc::new(gateway),
        Arc::new(AuditLog::new(Arc::clone(&clock))),
        IdentityResolver::with_assistant(Arc::new(KeywordMatcher::default())),
        clock,
        settings,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IntegrationConfig, StaticConfig};
    use crate::storage::BaggageStatus;
    use chrono::Utc;

    #[test]
    fn test_init_logger_is_idempotent() {
        init_logger();
        init_logger();
    }

    #[test]
    fn test_build_station_service_loads_records() {
        let records = vec![BaggageRecord::new(
            "JEDSV12345",
            BaggageStatus::FoundAwaitingClaim,
            "JED T1",
            Utc::now(),
        )];
        let service = build_station_service(
            Arc::new(StaticConfig(IntegrationConfig::default())),
            EngineSettings::default(),
            DataSource::LocalImport,
            records,
        )
        .unwrap();
        assert_eq!(service.store().len(), 1);
    }

    #[test]
    fn test_build_station_service_rejects_duplicate_import() {
        let now = Utc::now();
        let records = vec![
            BaggageRecord::new("JEDSV12345", BaggageStatus::InProgress, "JED", now),
            BaggageRecord::new("jedsv12345", BaggageStatus::Urgent, "RUH", now),
        ];
        let result = build_station_service(
            Arc::new(StaticConfig(IntegrationConfig::default())),
            EngineSettings::default(),
            DataSource::LocalImport,
            records,
        );
        assert!(matches!(result, Err(TraceError::DuplicateReport(_))));
    }
}

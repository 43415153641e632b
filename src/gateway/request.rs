//! Outbound request construction.
//!
//! Every call carries the bearer credential, the agent/station/airline
//! codes, and a per-request trace id for downstream correlation. The trace
//! id is built from the config, the clock and a counter, so it is unique
//! within a process and reproducible under a manual clock.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::config::IntegrationConfig;

use super::transport::{GatewayRequest, Method};

pub const HEADER_AGENT_ID: &str = "WT-Agent-ID";
pub const HEADER_STATION_CODE: &str = "WT-Station-Code";
pub const HEADER_AIRLINE_CODE: &str = "WT-Airline-Code";
pub const HEADER_REQUEST_ID: &str = "X-Request-ID";

#[derive(Debug, Default)]
pub struct RequestIdGenerator {
    counter: AtomicU64,
}

impl RequestIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self, config: &IntegrationConfig, now: DateTime<Utc>) -> String {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!(
            "SGS-{}{}-{}-{:06}",
            config.airline_code,
            config.station_code,
            now.timestamp_millis(),
            seq
        )
    }
}

pub fn standard_headers(config: &IntegrationConfig, request_id: &str) -> Vec<(String, String)> {
    vec![
        ("Content-Type".to_string(), "application/json".to_string()),
        ("Accept".to_string(), "application/json".to_string()),
        ("Authorization".to_string(), format!("Bearer {}", config.api_key)),
        (HEADER_AGENT_ID.to_string(), config.agent_id.clone()),
        (HEADER_STATION_CODE.to_string(), config.station_code.clone()),
        (HEADER_AIRLINE_CODE.to_string(), config.airline_code.clone()),
        (HEADER_REQUEST_ID.to_string(), request_id.to_string()),
    ]
}

pub fn build_request(
    config: &IntegrationConfig,
    request_id: &str,
    method: Method,
    url: String,
    body: Option<Value>,
) -> GatewayRequest {
    GatewayRequest {
        method,
        url,
        headers: standard_headers(config, request_id),
        body,
    }
}

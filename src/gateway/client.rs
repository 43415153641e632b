//! Resilient client for the tracing network.
//!
//! Circuit-breaker behaviour:
//! 1. `connected == false` - serve from the fallback cache, no transport call
//! 2. `connected == true` - one live call bounded by the gateway timeout
//! 3. Timeout, non-2xx, transport or decode failure - log and serve from the
//!    fallback cache
//!
//! Read paths never surface a remote outage. Pushes are at-most-once: the
//! cache is updated, a failed PATCH is logged and dropped, nothing is queued
//! for redelivery.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::{ConfigProvider, IntegrationConfig, DEFAULT_REMOTE_TIMEOUT_SECS};
use crate::logging::structured::LogContext;
use crate::resolution::identifier::Identifier;
use crate::storage::models::{BaggageRecord, RecordPatch};
use crate::{log_debug, log_error, log_info, log_warn};

use super::cache::FallbackCache;
use super::request::{build_request, RequestIdGenerator};
use super::transport::{GatewayError, GatewayRequest, Method, Transport};
use super::wire::{decode_record_list, decode_search_hit, encode_patch};

/// What happened to an outbound update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Accepted by the network.
    Mirrored,
    /// Simulation mode; only the fallback cache saw it.
    Simulated,
    /// The live call failed and the update was not delivered.
    Dropped,
}

/// Result of one attempted remote call.
enum RemoteCall {
    Simulated,
    Live(String),
    Failed(GatewayError),
}

pub struct RemoteGateway {
    config: Arc<dyn ConfigProvider>,
    transport: Arc<dyn Transport>,
    cache: Arc<FallbackCache>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
    request_ids: RequestIdGenerator,
}

impl RemoteGateway {
    pub fn new(
        config: Arc<dyn ConfigProvider>,
        transport: Arc<dyn Transport>,
        cache: Arc<FallbackCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            transport,
            cache,
            clock,
            timeout: Duration::from_secs(DEFAULT_REMOTE_TIMEOUT_SECS),
            request_ids: RequestIdGenerator::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn cache(&self) -> &FallbackCache {
        &self.cache
    }

    /// Current active-report set (`GET /reports/active`).
    pub fn fetch_active(&self) -> Vec<BaggageRecord> {
        let ctx = self.log_context();
        match self.call(Method::Get, "/reports/active", None, None, &ctx) {
            RemoteCall::Live(body) => match decode_record_list(&body, self.clock.now()) {
                Some(records) => {
                    log_info!(ctx, "REMOTE_ACTIVE_FETCHED", records = records.len());
                    records
                }
                None => {
                    let err = GatewayError::Decode("expected a list of reports".into());
                    self.fallback_snapshot(&ctx, &err)
                }
            },
            RemoteCall::Failed(err) => self.fallback_snapshot(&ctx, &err),
            RemoteCall::Simulated => self.cache.snapshot(),
        }
    }

    /// Server-side lookup (`GET /search?q=&type=`), falling back to the cache.
    pub fn search(&self, identifier: &Identifier) -> Option<BaggageRecord> {
        let ctx = self.log_context();
        let query = [
            ("q", identifier.query()),
            ("type", identifier.kind().wire_tag().to_string()),
        ];
        match self.call(Method::Get, "/search", Some(&query), None, &ctx) {
            RemoteCall::Live(body) => {
                if let Some(record) = decode_search_hit(&body, self.clock.now()) {
                    log_info!(ctx, "REMOTE_SEARCH_HIT", query = identifier.to_string());
                    return Some(record);
                }
                log_debug!(ctx, "REMOTE_SEARCH_MISS", query = identifier.to_string());
                self.cache.find(identifier)
            }
            RemoteCall::Failed(err) => {
                log_warn!(ctx, "REMOTE_FALLBACK", op = "search", error = err.to_string());
                self.cache.find(identifier)
            }
            RemoteCall::Simulated => self.cache.find(identifier),
        }
    }

    /// Best-effort outbound mirror of a committed local update
    /// (`PATCH /reports/{id}`).
    pub fn push(&self, committed: &BaggageRecord, patch: &RecordPatch) -> SyncOutcome {
        let ctx = self.log_context().with_report(&committed.report_id);
        let endpoint = format!("/reports/{}", committed.report_id);
        let body = encode_patch(patch, committed);

        let outcome = match self.call(Method::Patch, &endpoint, None, Some(body), &ctx) {
            RemoteCall::Live(_) => SyncOutcome::Mirrored,
            RemoteCall::Simulated => SyncOutcome::Simulated,
            RemoteCall::Failed(err) => {
                log_warn!(ctx, "REMOTE_PUSH_DROPPED", error = err.to_string());
                SyncOutcome::Dropped
            }
        };

        let cached = self
            .cache
            .apply(&committed.report_id, patch, committed.last_update);
        log_info!(
            ctx,
            "REMOTE_SYNC",
            outcome = outcome,
            cache_updated = cached,
        );
        outcome
    }

    fn log_context(&self) -> LogContext {
        LogContext::new(&format!("wt-{}", &Uuid::new_v4().to_string()[..8]))
    }

    fn fallback_snapshot(&self, ctx: &LogContext, err: &GatewayError) -> Vec<BaggageRecord> {
        let records = self.cache.snapshot();
        log_warn!(
            ctx,
            "REMOTE_FALLBACK",
            op = "fetch_active",
            error = err.to_string(),
            cached = records.len(),
        );
        records
    }

    fn call(
        &self,
        method: Method,
        endpoint: &str,
        query: Option<&[(&str, String)]>,
        body: Option<Value>,
        ctx: &LogContext,
    ) -> RemoteCall {
        // Read per call so a settings toggle applies to the next request.
        let config = self.config.integration();
        if !config.connected {
            log_debug!(ctx, "REMOTE_SIMULATED", method = method.as_str(), endpoint = endpoint);
            return RemoteCall::Simulated;
        }

        let url = match endpoint_url(&config, endpoint, query) {
            Ok(url) => url,
            Err(err) => {
                log_warn!(ctx, "REMOTE_URL_INVALID", base_url = config.base_url, error = err.to_string());
                return RemoteCall::Failed(err);
            }
        };
        let request_id = self.request_ids.next_id(&config, self.clock.now());
        let request = build_request(&config, &request_id, method, url, body);

        log_info!(
            ctx,
            "REMOTE_REQUEST",
            method = method.as_str(),
            url = request.url,
            request_id = request_id,
        );

        match self.execute_bounded(request) {
            Ok(body) => RemoteCall::Live(body),
            Err(err) => {
                log_error!(
                    ctx,
                    "REMOTE_CONNECTION_FAILED",
                    request_id = request_id,
                    error = err.to_string(),
                );
                RemoteCall::Failed(err)
            }
        }
    }

    /// Run the transport on a worker thread and wait at most `timeout`.
    /// A late answer is dropped with the worker's channel.
    fn execute_bounded(&self, request: GatewayRequest) -> Result<String, GatewayError> {
        let (tx, rx) = mpsc::channel();
        let transport = Arc::clone(&self.transport);

        thread::Builder::new()
            .name("wt-remote-call".to_string())
            .spawn(move || {
                let _ = tx.send(transport.execute(&request));
            })
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        match rx.recv_timeout(self.timeout) {
            Ok(Ok(response)) if response.is_success() => Ok(response.body),
            Ok(Ok(response)) => Err(GatewayError::Status(response.status)),
            Ok(Err(err)) => Err(err),
            Err(RecvTimeoutError::Timeout) => Err(GatewayError::Timeout(self.timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(GatewayError::Transport(
                "remote worker exited without a response".to_string(),
            )),
        }
    }
}

fn endpoint_url(
    config: &IntegrationConfig,
    endpoint: &str,
    query: Option<&[(&str, String)]>,
) -> Result<String, GatewayError> {
    let raw = format!("{}{}", config.base_url.trim_end_matches('/'), endpoint);
    let url = match query {
        Some(params) => reqwest::Url::parse_with_params(
            &raw,
            params.iter().map(|(k, v)| (*k, v.as_str())),
        ),
        None => reqwest::Url::parse(&raw),
    };
    url.map(|u| u.to_string())
        .map_err(|e| GatewayError::Transport(format!("invalid url {}: {}", raw, e)))
}

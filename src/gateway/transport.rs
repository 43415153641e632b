//! Transport seam for the tracing network.
//!
//! The gateway builds fully-formed requests and hands them to a
//! `Transport`. The production transport is a blocking reqwest client; tests
//! inject counting or stalling transports.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// Why a remote call could not be used. Never leaves the gateway: every
/// variant ends in a fallback to the local cache.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("remote call timed out after {0:?}")]
    Timeout(Duration),
    #[error("remote returned HTTP {0}")]
    Status(u16),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("undecodable response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Patch,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Patch => "PATCH",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl GatewayRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub trait Transport: Send + Sync {
    fn execute(&self, request: &GatewayRequest) -> Result<TransportResponse, GatewayError>;
}

/// HTTP transport over reqwest's blocking client.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Build a client whose own timeout matches the gateway bound.
    pub fn new(timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: &GatewayRequest) -> Result<TransportResponse, GatewayError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Patch => self.client.patch(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        Ok(TransportResponse { status, body })
    }
}

/// Refuses every call. Stands in where no network stack is wired, so a
/// connected gateway degrades to its cache.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineTransport;

impl Transport for OfflineTransport {
    fn execute(&self, _request: &GatewayRequest) -> Result<TransportResponse, GatewayError> {
        Err(GatewayError::Transport("no transport configured".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range() {
        let ok = TransportResponse { status: 204, body: String::new() };
        let redirect = TransportResponse { status: 302, body: String::new() };
        let unavailable = TransportResponse { status: 503, body: String::new() };
        assert!(ok.is_success());
        assert!(!redirect.is_success());
        assert!(!unavailable.is_success());
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let request = GatewayRequest {
            method: Method::Get,
            url: "https://wt.example/reports/active".into(),
            headers: vec![("X-Request-ID".into(), "SGS-1".into())],
            body: None,
        };
        assert_eq!(request.header("x-request-id"), Some("SGS-1"));
        assert_eq!(request.header("Authorization"), None);
    }

    #[test]
    fn test_http_transport_builds() {
        assert!(HttpTransport::new(Duration::from_secs(10)).is_ok());
    }
}

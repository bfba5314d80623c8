//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Every upstream must be an absolute http(s) URL with a host
//! - Validate value ranges (timeouts > 0, port > 0)
//!
//! Returns all validation errors, not just the first.

use std::fmt;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    NoUpstreams,
    InvalidUpstream { address: String, reason: String },
    ZeroPort,
    ZeroTimeout(&'static str),
    InvalidMetricsAddress(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::NoUpstreams => write!(f, "at least one upstream is required"),
            ValidationError::InvalidUpstream { address, reason } => {
                write!(f, "upstream {:?} is invalid: {}", address, reason)
            }
            ValidationError::ZeroPort => write!(f, "listener.port must be non-zero"),
            ValidationError::ZeroTimeout(name) => write!(f, "timeouts.{} must be non-zero", name),
            ValidationError::InvalidMetricsAddress(addr) => {
                write!(f, "observability.metrics_address {:?} is not a socket address", addr)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Check that `address` is an absolute http(s) URL with a host.
///
/// Returns the parsed URL, or the reason it was rejected.
pub fn parse_upstream(address: &str) -> Result<Url, String> {
    let url = Url::parse(address).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme {:?}", other)),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err("missing host".to_string());
    }
    Ok(url)
}

pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.upstreams.is_empty() {
        errors.push(ValidationError::NoUpstreams);
    }
    for address in &config.upstreams {
        if let Err(reason) = parse_upstream(address) {
            errors.push(ValidationError::InvalidUpstream {
                address: address.clone(),
                reason,
            });
        }
    }

    if config.listener.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }
    if config.timeouts.connect_secs == Some(0) {
        errors.push(ValidationError::ZeroTimeout("connect_secs"));
    }
    if config.timeouts.request_secs == Some(0) {
        errors.push(ValidationError::ZeroTimeout("request_secs"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

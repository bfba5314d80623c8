//! Upstream target abstraction.
//!
//! # Responsibilities
//! - Represent a single upstream server by its base URL
//! - Report liveness through a pluggable source
//! - Forward requests to the upstream

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{extract::Request, response::Response};
use url::Url;

use crate::config::validation::parse_upstream;
use crate::error::ProxyError;
use crate::http::forward::RequestForwarder;

/// Source of an upstream's liveness.
///
/// Selection only reads this; whatever writes it (a health checker, a test)
/// lives outside the balancer.
pub trait Liveness: Send + Sync + Debug {
    fn is_alive(&self) -> bool;
}

/// Liveness source that never marks a target dead.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysAlive;

impl Liveness for AlwaysAlive {
    fn is_alive(&self) -> bool {
        true
    }
}

impl Liveness for AtomicBool {
    fn is_alive(&self) -> bool {
        self.load(Ordering::Acquire)
    }
}

/// A single upstream server.
#[derive(Debug)]
pub struct UpstreamTarget {
    /// The address as configured.
    address: String,
    /// Parsed base URL; only scheme and authority are used.
    url: Url,
    liveness: Arc<dyn Liveness>,
    forwarder: RequestForwarder,
}

impl UpstreamTarget {
    /// Create a target from an absolute http(s) URL.
    pub fn new(address: &str, forwarder: RequestForwarder) -> Result<Self, ProxyError> {
        let url = parse_upstream(address).map_err(|reason| ProxyError::InvalidAddress {
            address: address.to_string(),
            reason,
        })?;

        Ok(Self {
            address: address.to_string(),
            url,
            liveness: Arc::new(AlwaysAlive),
            forwarder,
        })
    }

    /// Replace the liveness source.
    pub fn with_liveness(mut self, liveness: Arc<dyn Liveness>) -> Self {
        self.liveness = liveness;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn is_alive(&self) -> bool {
        self.liveness.is_alive()
    }

    /// Relay `request` to this upstream and return its response.
    pub async fn forward(&self, request: Request) -> Result<Response, ProxyError> {
        self.forwarder.forward(&self.url, request).await
    }
}

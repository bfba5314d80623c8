//! Round-robin balancer with liveness skipping.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use axum::{
    extract::Request,
    response::{IntoResponse, Response},
};

use crate::error::ProxyError;
use crate::http::forward::RequestForwarder;
use crate::load_balancer::upstream::UpstreamTarget;
use crate::observability::metrics;

/// Owns a fixed, ordered upstream pool and the rotation cursor.
///
/// The cursor only moves forward. A selection that examines `k` candidates
/// (skipped dead ones plus the chosen one) advances it by `k` in a single
/// compare-and-swap, so concurrent callers never share a cursor value.
#[derive(Debug)]
pub struct Balancer {
    targets: Vec<UpstreamTarget>,
    cursor: AtomicUsize,
}

impl Balancer {
    /// Build a pool from upstream addresses, preserving their order.
    pub fn new<S: AsRef<str>>(
        addresses: &[S],
        forwarder: RequestForwarder,
    ) -> Result<Self, ProxyError> {
        let targets = addresses
            .iter()
            .map(|address| UpstreamTarget::new(address.as_ref(), forwarder.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_targets(targets)
    }

    /// Build a pool from already constructed targets.
    pub fn from_targets(targets: Vec<UpstreamTarget>) -> Result<Self, ProxyError> {
        if targets.is_empty() {
            return Err(ProxyError::EmptyPool);
        }
        Ok(Self {
            targets,
            cursor: AtomicUsize::new(0),
        })
    }

    pub fn targets(&self) -> &[UpstreamTarget] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Current cursor value (total candidates examined so far).
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    /// Pick the next live target in rotation order.
    ///
    /// Examines at most one full rotation. When nothing is live the cursor is
    /// left where it was and `NoLiveTargets` is returned.
    pub fn select_next(&self) -> Result<&UpstreamTarget, ProxyError> {
        let len = self.targets.len();
        let mut current = self.cursor.load(Ordering::Acquire);

        loop {
            let found = (0..len)
                .map(|offset| (offset + 1, &self.targets[current.wrapping_add(offset) % len]))
                .find(|(_, target)| target.is_alive());

            let Some((examined, target)) = found else {
                return Err(ProxyError::NoLiveTargets { pool_size: len });
            };

            match self.cursor.compare_exchange_weak(
                current,
                current.wrapping_add(examined),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(target),
                Err(actual) => current = actual,
            }
        }
    }

    /// Select a target and relay `request` to it.
    ///
    /// Per-request failures become a response; nothing here can fail the server.
    pub async fn dispatch(&self, request: Request) -> Response {
        let start = Instant::now();
        let method = request.method().to_string();

        let target = match self.select_next() {
            Ok(target) => target,
            Err(e) => {
                tracing::warn!(error = %e, "Rejecting request");
                let response = e.into_response();
                metrics::record_request(&method, response.status().as_u16(), "none", start);
                return response;
            }
        };

        tracing::info!(upstream = %target.address(), "Forwarding request to address");

        let response = match target.forward(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(upstream = %target.address(), error = %e, "Upstream error");
                e.into_response()
            }
        };
        metrics::record_request(&method, response.status().as_u16(), target.address(), start);
        response
    }
}

//! Error taxonomy shared by the balancer and the forwarder.
//!
//! Startup errors (`InvalidAddress`, `EmptyPool`, `TlsConfig`) are fatal and
//! surface from constructors. Per-request errors are turned into a response
//! for the caller and never leave the handler.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    /// An upstream address is not an absolute http(s) URL with a host.
    #[error("invalid upstream address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// No upstream addresses were configured.
    #[error("upstream pool is empty")]
    EmptyPool,

    /// A full rotation found no live target.
    #[error("no live upstream among {pool_size} targets")]
    NoLiveTargets { pool_size: usize },

    /// The outbound call to the selected upstream failed.
    #[error("upstream {upstream} unreachable: {source}")]
    UpstreamUnreachable {
        upstream: String,
        #[source]
        source: hyper_util::client::legacy::Error,
    },

    /// The configured per-request timeout elapsed.
    #[error("upstream {upstream} timed out")]
    UpstreamTimeout { upstream: String },

    /// The rewritten upstream URL could not be built from the request.
    #[error("cannot build upstream request: {0}")]
    InvalidRequest(String),

    /// The outbound TLS client configuration could not be built.
    #[error("failed to build TLS client config: {0}")]
    TlsConfig(#[from] rustls::Error),
}

impl ProxyError {
    /// Status code returned to the caller for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::NoLiveTargets { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::UpstreamUnreachable { .. } => StatusCode::BAD_GATEWAY,
            ProxyError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::InvalidAddress { .. }
            | ProxyError::EmptyPool
            | ProxyError::TlsConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            ProxyError::NoLiveTargets { .. } => "No live upstream available",
            ProxyError::UpstreamUnreachable { .. } => "Upstream request failed",
            ProxyError::UpstreamTimeout { .. } => "Upstream request timed out",
            ProxyError::InvalidRequest(_) => "Bad request",
            _ => "Internal proxy error",
        };
        (status, body).into_response()
    }
}

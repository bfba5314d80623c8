//! Request forwarding to a single upstream.
//!
//! # Responsibilities
//! - Rewrite scheme, authority and `Host` to the upstream's
//! - Preserve method, path, query, headers and body
//! - Stream the upstream response back without buffering it
//! - Map transport failures to gateway errors
//!
//! # Design Decisions
//! - The inbound request is consumed; the outbound request is built from its parts
//! - The path and query are copied byte for byte; no URL normalization
//! - Redirects are relayed, never followed
//! - Dropping the returned future or body aborts the upstream call

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request},
    http::{header::HOST, uri::PathAndQuery, HeaderValue, Uri},
    response::Response,
};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::Url;

use crate::config::TimeoutConfig;
use crate::error::ProxyError;
use crate::http::headers::{append_forwarded_for, remove_hop_by_hop};

type UpstreamClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Relays requests to upstreams over a shared outbound client.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct RequestForwarder {
    client: UpstreamClient,
    request_timeout: Option<Duration>,
}

impl RequestForwarder {
    /// Build a forwarder honouring the configured timeouts.
    pub fn new(timeouts: &TimeoutConfig) -> Result<Self, ProxyError> {
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_connect_timeout(timeouts.connect());

        let https = HttpsConnectorBuilder::new()
            .with_tls_config(tls_config()?)
            .https_or_http()
            .enable_http1()
            .wrap_connector(http);

        Ok(Self {
            client: Client::builder(TokioExecutor::new()).build(https),
            request_timeout: timeouts.request(),
        })
    }

    /// Forward `request` to `target` and relay its response.
    ///
    /// The timeout, when configured, covers the wait for response headers.
    pub async fn forward(&self, target: &Url, request: Request) -> Result<Response, ProxyError> {
        let (mut parts, body) = request.into_parts();
        let host = HeaderValue::from_str(&authority(target))
            .map_err(|e| ProxyError::InvalidRequest(e.to_string()))?;
        let client_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        parts.uri = rewrite_uri(target, &parts.uri)?;
        remove_hop_by_hop(&mut parts.headers);
        parts.headers.insert(HOST, host);
        if let Some(addr) = client_addr {
            append_forwarded_for(&mut parts.headers, addr.ip());
        }

        let outbound = Request::from_parts(parts, body);
        let pending = self.client.request(outbound);
        let result = match self.request_timeout {
            Some(limit) => tokio::time::timeout(limit, pending).await.map_err(|_| {
                ProxyError::UpstreamTimeout {
                    upstream: target.to_string(),
                }
            })?,
            None => pending.await,
        };
        let response = result.map_err(|source| ProxyError::UpstreamUnreachable {
            upstream: target.to_string(),
            source,
        })?;

        let (mut parts, body) = response.into_parts();
        remove_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

/// Client TLS settings: ring provider, webpki root store.
fn tls_config() -> Result<rustls::ClientConfig, ProxyError> {
    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = rustls::ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()?
    .with_root_certificates(roots)
    .with_no_client_auth();
    Ok(config)
}

/// `host[:port]` of the upstream, as sent in the `Host` header.
pub fn authority(target: &Url) -> String {
    let host = target.host_str().unwrap_or_default();
    match target.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// Combine the upstream's scheme and authority with the inbound path and query.
///
/// The path and query are reused as received. Any path on the upstream URL
/// itself is ignored.
pub fn rewrite_uri(target: &Url, inbound: &Uri) -> Result<Uri, ProxyError> {
    let path_and_query = inbound
        .path_and_query()
        .cloned()
        .unwrap_or_else(|| PathAndQuery::from_static("/"));

    Uri::builder()
        .scheme(target.scheme())
        .authority(authority(target).as_str())
        .path_and_query(path_and_query)
        .build()
        .map_err(|e| ProxyError::InvalidRequest(e.to_string()))
}

//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router; every path and method goes to the balancer
//! - Wire up middleware (CORS, tracing, request ID)
//! - Serve on a listener until shutdown is signalled

use axum::{
    extract::{Request, State},
    middleware,
    response::Response,
    routing::any,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::http::forward::RequestForwarder;
use crate::http::middleware::cors_middleware;
use crate::http::request::MakeRequestUuid;
use crate::lifecycle::shutdown::notified;
use crate::load_balancer::Balancer;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub balancer: Arc<Balancer>,
}

/// HTTP entry point of the load balancer.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    balancer: Arc<Balancer>,
}

impl HttpServer {
    /// Build the upstream pool from `config` and the router around it.
    ///
    /// Fails on an empty pool or a malformed upstream address.
    pub fn new(config: ProxyConfig) -> Result<Self, ProxyError> {
        let forwarder = RequestForwarder::new(&config.timeouts)?;
        let balancer = Arc::new(Balancer::new(&config.upstreams, forwarder)?);
        Ok(Self::with_balancer(config, balancer))
    }

    /// Serve an existing balancer; `config.upstreams` is ignored.
    pub fn with_balancer(config: ProxyConfig, balancer: Arc<Balancer>) -> Self {
        let state = AppState {
            balancer: balancer.clone(),
        };
        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            balancer,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state);

        if config.cors.enabled {
            router = router.layer(middleware::from_fn(cors_middleware));
        }

        router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstreams = self.balancer.len(),
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(notified(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The fully layered router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn balancer(&self) -> &Arc<Balancer> {
        &self.balancer
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

async fn proxy_handler(State(state): State<AppState>, request: Request) -> Response {
    tracing::debug!(
        method = %request.method(),
        path = %request.uri().path(),
        "Proxying request"
    );
    state.balancer.dispatch(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::UpstreamTarget;
    use axum::body::Body;
    use axum::http::{header::ACCESS_CONTROL_ALLOW_ORIGIN, Method, StatusCode};
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn dead_pool_server(cors: bool) -> HttpServer {
        let mut config = ProxyConfig::default();
        config.cors.enabled = cors;
        let forwarder = RequestForwarder::new(&config.timeouts).unwrap();
        let target = UpstreamTarget::new("http://dead.test", forwarder)
            .unwrap()
            .with_liveness(Arc::new(AtomicBool::new(false)));
        let balancer = Arc::new(Balancer::from_targets(vec![target]).unwrap());
        HttpServer::with_balancer(config, balancer)
    }

    #[test]
    fn test_new_rejects_empty_pool() {
        let mut config = ProxyConfig::default();
        config.upstreams.clear();
        assert!(matches!(HttpServer::new(config), Err(ProxyError::EmptyPool)));
    }

    #[tokio::test]
    async fn test_no_live_upstream_is_503_with_cors_and_request_id() {
        let server = dead_pool_server(true);
        let request = Request::builder().uri("/foo").body(Body::empty()).unwrap();

        let response = server.router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_options_never_reaches_balancer() {
        let server = dead_pool_server(true);
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/anything")
            .body(Body::empty())
            .unwrap();

        let response = server.router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(server.balancer().cursor(), 0);
    }

    #[tokio::test]
    async fn test_cors_can_be_disabled() {
        let server = dead_pool_server(false);
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();

        let response = server.router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!response.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn test_existing_request_id_is_kept() {
        let server = dead_pool_server(true);
        let request = Request::builder()
            .uri("/")
            .header("x-request-id", "abc-123")
            .body(Body::empty())
            .unwrap();

        let response = server.router().oneshot(request).await.unwrap();

        assert_eq!(response.headers()["x-request-id"], "abc-123");
    }
}

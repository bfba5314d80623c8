//! Round-robin HTTP load balancer.
//!
//! ```text
//! client ─▶ HttpServer (CORS, request ID, tracing)
//!              │
//!              ▼
//!           Balancer::dispatch ─▶ select_next (round robin, skip dead)
//!              │
//!              ▼
//!           UpstreamTarget::forward ─▶ RequestForwarder ─▶ upstream
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;

pub use config::ProxyConfig;
pub use error::ProxyError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use load_balancer::{Balancer, UpstreamTarget};

//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → middleware/cors.rs (CORS headers, OPTIONS short-circuit)
//!     → [load balancer picks upstream]
//!     → forward.rs (rewrite, relay, stream response)
//!     → headers.rs (hop-by-hop stripping, X-Forwarded-For)
//!     → Send to client
//! ```

pub mod forward;
pub mod headers;
pub mod middleware;
pub mod request;
pub mod server;

pub use forward::RequestForwarder;
pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::HttpServer;

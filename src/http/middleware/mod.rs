//! Request/response middleware for the edge router.

pub mod cors;

pub use cors::cors_middleware;

//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Request arrives
//!     → round_robin.rs (select next live upstream, advance cursor)
//!     → upstream.rs (forward to the chosen target)
//!     → Return upstream response or error response
//! ```
//!
//! # Design Decisions
//! - The pool is fixed at construction and never empty
//! - Liveness is read through a trait so a health checker can be plugged in
//! - Selection never scans more than one full rotation

pub mod round_robin;
pub mod upstream;

pub use round_robin::Balancer;
pub use upstream::{AlwaysAlive, Liveness, UpstreamTarget};

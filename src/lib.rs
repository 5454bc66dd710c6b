//! Resilient HTTP transport for cluster-aware RPC clients.
//!
//! # Architecture Overview
//!
//! ```text
//!     caller ──▶ decorators ──▶ transport (HttpTransport)
//!                (context,       │  overall-timeout racer
//!                 tracing)       │  retry loop (connection attempts)
//!                                │  per-attempt pipeline
//!                                │      send body → response → read body
//!                                ▼
//!                              native (Connector / Exchange)
//!                                │  hyper HTTP/1.1 + keep-alive pool
//!                                ▼
//!                              endpoint
//!
//!     Cross-cutting: config, observability, resilience (races), buffer pool
//! ```
//!
//! `send` never fails. Every transport problem comes back as a [`Response`]
//! with a synthetic [`ResponseCode`].

// Core subsystems
pub mod buffer;
pub mod model;
pub mod native;
pub mod transport;

// Wrappers
pub mod decorators;

// Cross-cutting concerns
pub mod config;
pub mod observability;
pub mod resilience;

pub use config::TransportConfig;
pub use decorators::{DistributedContext, TransportWithDistributedContext, TransportWithTracing};
pub use model::{Request, RequestError, Response, ResponseCode};
pub use native::http1::HyperConnector;
pub use transport::{HttpTransport, Transport};

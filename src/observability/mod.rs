//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Transport engine and decorators produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!     → decorators::tracing (per-request spans with request ids)
//!
//! Consumers:
//!     → Log aggregation (stdout, JSON lines)
//!     → Whatever `metrics` recorder the host application installs
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Metrics are cheap (atomic increments)
//! - Tracing is optional to reduce overhead when not needed

pub mod logging;
pub mod metrics;

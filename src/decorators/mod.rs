//! Transport decorators.
//!
//! Wrappers that implement [`Transport`](crate::transport::Transport) around
//! another transport and add one concern each.
//!
//! # Data Flow
//! ```text
//! caller
//!     → TransportWithDistributedContext (context headers)
//!     → TransportWithTracing (span per request)
//!     → HttpTransport
//! ```

pub mod context;
pub mod tracing;

pub use self::context::{DistributedContext, TransportWithDistributedContext};
pub use self::tracing::TransportWithTracing;

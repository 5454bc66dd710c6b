//! Resilience primitives.
//!
//! # Data Flow
//! ```text
//! send(request, timeout)
//!     → race.rs (overall deadline vs. the retry loop)
//!         → race.rs (connect deadline vs. a connect/response phase)
//!         → cancellable() around every I/O step of an attempt
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every send has a deadline
//! - Retries live in the transport engine and only follow connection failures
//! - One race primitive serves both deadlines

pub mod race;

pub use race::{cancellable, race, Race};

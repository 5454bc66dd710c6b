//! Buffer management.
//!
//! # Design Decisions
//! - One pool per transport, shared by every concurrent send
//! - Checkout is an RAII guard; nothing relies on finalizers
//! - Only body readers borrow buffers, and only for the duration of a read loop

pub mod pool;

pub use pool::{BufferPool, PooledBuffer};

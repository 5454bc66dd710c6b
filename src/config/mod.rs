//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → TransportConfig (validated, immutable)
//!     → read once when an HttpTransport is built
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; a new transport picks up changes
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::BufferConfig;
pub use schema::ConnectTimeoutConfig;
pub use schema::ConnectionConfig;
pub use schema::ObservabilityConfig;
pub use schema::TransportConfig;

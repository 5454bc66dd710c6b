//! Request and response model.
//!
//! # Data Flow
//! ```text
//! caller builds Request (immutable)
//!     → transport reads it on every attempt
//!     → Response (wire code or synthetic code, headers, content, version)
//! ```
//!
//! # Design Decisions
//! - Requests are replayable; content is `Bytes` so attempts clone cheaply
//! - Responses never carry errors; the code says what happened
//! - Synthetic codes live in the same code space as wire codes

pub mod code;
pub mod content;
pub mod request;
pub mod response;
pub mod url_ext;

pub use code::ResponseCode;
pub use content::{ContentRange, ResponseContent};
pub use request::{Content, Request, RequestError};
pub use response::Response;

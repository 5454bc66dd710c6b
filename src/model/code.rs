//! Response codes.
//!
//! Wire status codes pass through untouched. Failures that never reached the
//! wire are reported with synthetic codes so callers only ever inspect a code.

use serde::{Deserialize, Serialize};

/// Status code of a [`Response`](crate::model::Response).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseCode(u16);

impl ResponseCode {
    /// Unclassified failure inside the transport.
    pub const UNKNOWN_FAILURE: ResponseCode = ResponseCode(0);

    pub const OK: ResponseCode = ResponseCode(200);
    pub const NO_CONTENT: ResponseCode = ResponseCode(204);
    pub const PARTIAL_CONTENT: ResponseCode = ResponseCode(206);
    pub const BAD_REQUEST: ResponseCode = ResponseCode(400);
    pub const NOT_FOUND: ResponseCode = ResponseCode(404);

    /// Overall deadline exceeded, either in the engine or in the native stack.
    pub const REQUEST_TIMEOUT: ResponseCode = ResponseCode(408);

    /// Every connection attempt failed.
    pub const CONNECT_FAILURE: ResponseCode = ResponseCode(450);
    /// Response could not be received after the connection was established.
    pub const RECEIVE_FAILURE: ResponseCode = ResponseCode(451);
    /// Request content could not be sent.
    pub const SEND_FAILURE: ResponseCode = ResponseCode(452);

    /// The caller (or the overall timeout on its behalf) canceled the request.
    pub const CANCELED: ResponseCode = ResponseCode(499);

    pub const INTERNAL_SERVER_ERROR: ResponseCode = ResponseCode(500);
    pub const SERVICE_UNAVAILABLE: ResponseCode = ResponseCode(503);

    /// Wrap a raw numeric code.
    pub const fn from_u16(code: u16) -> Self {
        Self(code)
    }

    /// Raw numeric value.
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    pub fn is_informational(self) -> bool {
        (100..200).contains(&self.0)
    }

    pub fn is_success(self) -> bool {
        (200..300).contains(&self.0)
    }

    pub fn is_redirection(self) -> bool {
        (300..400).contains(&self.0)
    }

    pub fn is_client_error(self) -> bool {
        (400..500).contains(&self.0)
    }

    pub fn is_server_error(self) -> bool {
        (500..600).contains(&self.0)
    }

    /// True for the synthetic network failure codes (connect/receive/send).
    pub fn is_network_error(self) -> bool {
        matches!(
            self,
            Self::CONNECT_FAILURE | Self::RECEIVE_FAILURE | Self::SEND_FAILURE
        )
    }
}

impl From<http::StatusCode> for ResponseCode {
    fn from(status: http::StatusCode) -> Self {
        Self(status.as_u16())
    }
}

impl std::fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match *self {
            Self::UNKNOWN_FAILURE => "UnknownFailure",
            Self::REQUEST_TIMEOUT => "RequestTimeout",
            Self::CONNECT_FAILURE => "ConnectFailure",
            Self::RECEIVE_FAILURE => "ReceiveFailure",
            Self::SEND_FAILURE => "SendFailure",
            Self::CANCELED => "Canceled",
            _ => return write!(f, "{}", self.0),
        };
        write!(f, "{} ({})", self.0, name)
    }
}

//! Response returned to callers.

use http::{HeaderMap, Version};

use crate::model::code::ResponseCode;
use crate::model::content::ResponseContent;

/// Outcome of a send: always a value, never an error.
#[derive(Debug, Clone)]
pub struct Response {
    code: ResponseCode,
    headers: HeaderMap,
    content: Option<ResponseContent>,
    version: Option<Version>,
}

impl Response {
    /// Response carrying only a code (synthetic failures, early exits).
    pub fn new(code: ResponseCode) -> Self {
        Self {
            code,
            headers: HeaderMap::new(),
            content: None,
            version: None,
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_content(mut self, content: Option<ResponseContent>) -> Self {
        self.content = content;
        self
    }

    /// Same response under a different code.
    pub(crate) fn with_code(mut self, code: ResponseCode) -> Self {
        self.code = code;
        self
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    pub fn code(&self) -> ResponseCode {
        self.code
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn content(&self) -> Option<&ResponseContent> {
        self.content.as_ref()
    }

    /// Length of the content, zero when absent.
    pub fn content_length(&self) -> usize {
        self.content.as_ref().map_or(0, ResponseContent::len)
    }

    /// Protocol version, `None` when no response was received.
    pub fn version(&self) -> Option<Version> {
        self.version
    }
}

//! Response content and its header-derived metadata.

use bytes::Bytes;

/// Content type used when the server does not declare one.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Charset used when the server does not declare one.
pub const DEFAULT_CHARSET: &str = "utf-8";

/// Parsed `Content-Range` header (`bytes 0-499/1234`, `bytes */1234`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRange {
    pub unit: String,
    /// Inclusive `(first, last)` byte positions; `None` for unsatisfied ranges.
    pub range: Option<(u64, u64)>,
    /// Complete length; `None` when reported as `*`.
    pub length: Option<u64>,
}

impl ContentRange {
    /// Parse a `Content-Range` header value. Returns `None` on malformed input.
    pub fn parse(value: &str) -> Option<Self> {
        let (unit, spec) = value.trim().split_once(' ')?;
        if unit.is_empty() {
            return None;
        }
        let (range, length) = spec.trim().split_once('/')?;

        let range = match range.trim() {
            "*" => None,
            bounds => {
                let (first, last) = bounds.split_once('-')?;
                let first: u64 = first.trim().parse().ok()?;
                let last: u64 = last.trim().parse().ok()?;
                if last < first {
                    return None;
                }
                Some((first, last))
            }
        };

        let length = match length.trim() {
            "*" => None,
            total => Some(total.parse::<u64>().ok()?),
        };

        if range.is_none() && length.is_none() {
            return None;
        }
        if let (Some((_, last)), Some(total)) = (range, length) {
            if last >= total {
                return None;
            }
        }

        Some(Self {
            unit: unit.to_ascii_lowercase(),
            range,
            length,
        })
    }
}

/// Split a `Content-Type` value into its lowercase media type and optional charset.
pub fn parse_content_type(value: &str) -> (String, Option<String>) {
    let mut parts = value.split(';');
    let media_type = parts
        .next()
        .map(|media| media.trim().to_ascii_lowercase())
        .unwrap_or_default();

    let charset = parts.find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let value = value.trim().trim_matches('"');
        (!value.is_empty()).then(|| value.to_ascii_lowercase())
    });

    (media_type, charset)
}

/// Body of a received response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseContent {
    bytes: Bytes,
    content_type: String,
    charset: String,
    content_range: Option<ContentRange>,
}

impl ResponseContent {
    /// Content with the default type and charset.
    pub fn new(bytes: Bytes) -> Self {
        Self {
            bytes,
            content_type: OCTET_STREAM.to_string(),
            charset: DEFAULT_CHARSET.to_string(),
            content_range: None,
        }
    }

    pub fn with_content_type(mut self, content_type: String, charset: String) -> Self {
        self.content_type = content_type;
        self.charset = charset;
        self
    }

    pub fn with_content_range(mut self, range: Option<ContentRange>) -> Self {
        self.content_range = range;
        self
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn charset(&self) -> &str {
        &self.charset
    }

    pub fn content_range(&self) -> Option<&ContentRange> {
        self.content_range.as_ref()
    }

    /// Decode as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

//! Assembles the caller-facing [`Response`] from whatever an attempt produced.

use http::header::{CONTENT_RANGE, CONTENT_TYPE};
use http::HeaderMap;

use crate::model::content::{parse_content_type, DEFAULT_CHARSET};
use crate::model::{ContentRange, Response, ResponseCode, ResponseContent};
use crate::native::Exchange;
use crate::transport::classify::HttpActionStatus;
use crate::transport::state::AttemptState;

/// Response carrying the wire status of the native response.
pub(crate) fn build_success<E: Exchange>(state: &mut AttemptState<E>) -> Response {
    let code = state
        .head
        .as_ref()
        .map(|head| ResponseCode::from(head.status))
        .unwrap_or(ResponseCode::UNKNOWN_FAILURE);
    build_response(code, state)
}

/// Response carrying the synthetic code for `status`, plus any partial state.
pub(crate) fn build_failure<E: Exchange>(
    status: HttpActionStatus,
    state: &mut AttemptState<E>,
) -> Response {
    build_response(status.failure_code(), state)
}

/// Without a native response only the code is returned.
pub(crate) fn build_response<E: Exchange>(
    code: ResponseCode,
    state: &mut AttemptState<E>,
) -> Response {
    let Some(head) = state.head.take() else {
        return Response::new(code);
    };

    let content = state
        .body
        .take_bytes()
        .map(|bytes| describe_content(ResponseContent::new(bytes), &head.headers));

    Response::new(code)
        .with_headers(head.headers)
        .with_content(content)
        .with_version(head.version)
}

fn describe_content(content: ResponseContent, headers: &HeaderMap) -> ResponseContent {
    let content = match header_str(headers, CONTENT_TYPE) {
        Some(value) => {
            let (media_type, charset) = parse_content_type(value);
            content.with_content_type(
                media_type,
                charset.unwrap_or_else(|| DEFAULT_CHARSET.to_string()),
            )
        }
        None => content,
    };

    content.with_content_range(header_str(headers, CONTENT_RANGE).and_then(ContentRange::parse))
}

fn header_str(headers: &HeaderMap, name: http::header::HeaderName) -> Option<&str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

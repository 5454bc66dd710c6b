//! URL helpers for logging, tracing and metric labels.

use url::Url;

/// Render `url` without its query string and fragment.
pub fn url_without_query(url: &Url) -> String {
    let mut stripped = url.clone();
    stripped.set_query(None);
    stripped.set_fragment(None);
    stripped.to_string()
}

/// Replace variable path segments with placeholders so that URLs differing only
/// by identifiers collapse into one template:
/// `{guid}`, `{num}`, `{enc}` (url-encoded text) and `{hex}` (long hex strings).
pub fn normalize_url(url: &Url) -> String {
    let base = url_without_query(url);
    let path_start = base
        .find("://")
        .and_then(|scheme_end| {
            base[scheme_end + 3..]
                .find('/')
                .map(|offset| scheme_end + 3 + offset)
        })
        .unwrap_or(base.len());

    let (origin, path) = base.split_at(path_start);
    let mut normalized = String::with_capacity(base.len());
    normalized.push_str(origin);

    for (index, segment) in path.split('/').enumerate() {
        if index > 0 {
            normalized.push('/');
        }
        match classify_segment(segment) {
            Some(placeholder) => normalized.push_str(placeholder),
            None => normalized.push_str(segment),
        }
    }

    normalized
}

fn classify_segment(segment: &str) -> Option<&'static str> {
    if segment.is_empty() {
        return None;
    }
    if is_guid(segment) {
        Some("{guid}")
    } else if is_numeric(segment) {
        Some("{num}")
    } else if is_url_encoded(segment) {
        Some("{enc}")
    } else if is_long_hex(segment) {
        Some("{hex}")
    } else {
        None
    }
}

fn is_guid(segment: &str) -> bool {
    const DASHES: [usize; 4] = [8, 13, 18, 23];

    let bytes = segment.as_bytes();
    bytes.len() == 36
        && bytes.iter().enumerate().all(|(i, b)| {
            if DASHES.contains(&i) {
                *b == b'-'
            } else {
                b.is_ascii_hexdigit()
            }
        })
}

fn is_numeric(segment: &str) -> bool {
    segment.bytes().all(|b| b.is_ascii_digit() || b == b'-')
}

fn is_url_encoded(segment: &str) -> bool {
    segment.bytes().any(|b| b == b'%' || b == b'+')
}

fn is_long_hex(segment: &str) -> bool {
    segment.len() >= 8 && segment.len() % 2 == 0 && segment.bytes().all(|b| b.is_ascii_hexdigit())
}

//! Accept header predicates.
//!
//! # Design Decisions
//! - Purely textual checks, no media-range parsing or q-values
//! - JSON preference is a prefix test at offset 0, not a substring search
//! - Repeated `Accept` headers are joined with `", "` before any check
//! - Bytes outside visible ASCII are decoded as latin1, never rejected

use std::borrow::Cow;

use axum::http::{header::ACCEPT, HeaderMap, HeaderValue};

const JSON: &str = "application/json";
const HTML: &str = "text/html";
const WILDCARD: &str = "*/*";

/// Returns the `Accept` header as text, `None` only when it is absent.
pub fn accept_header(headers: &HeaderMap) -> Option<Cow<'_, str>> {
    let mut values = headers.get_all(ACCEPT).iter();
    let first = decode(values.next()?);

    let mut joined: Option<String> = None;
    for value in values {
        let buf = joined.get_or_insert_with(|| first.to_string());
        buf.push_str(", ");
        buf.push_str(&decode(value));
    }

    Some(match joined {
        Some(joined) => Cow::Owned(joined),
        None => first,
    })
}

fn decode(value: &HeaderValue) -> Cow<'_, str> {
    match value.to_str() {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => Cow::Owned(value.as_bytes().iter().map(|&b| char::from(b)).collect()),
    }
}

/// The client lists `application/json` first.
pub fn prefers_json(accept: &str) -> bool {
    accept.starts_with(JSON)
}

/// The client accepts `text/html`, either explicitly or through `*/*`.
pub fn accepts_html(accept: &str) -> bool {
    accept.contains(HTML) || accept.contains(WILDCARD)
}

//! Raw `url` query extraction.
//!
//! The target URL is taken from the raw query string up to its end rather
//! than split on `&`, so an unencoded `https://a/feed?x=1&y=2` survives
//! intact. The value is percent-decoded exactly once.

use std::borrow::Cow;

const URL_KEY: &str = "url=";

/// Extract the `url` parameter from a raw query string.
pub fn extract_url_param(raw_query: &str) -> Option<String> {
    let start = if raw_query.starts_with(URL_KEY) {
        URL_KEY.len()
    } else {
        raw_query.find("&url=")? + 1 + URL_KEY.len()
    };

    let raw_value = &raw_query[start..];
    let decoded = urlencoding::decode(raw_value)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| raw_value.to_string());

    let value = decoded.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

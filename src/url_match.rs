//! URL comparison with placeholder query parameters.
//!
//! Golden URLs may wrap a query value in brackets (`/search?query=[laptop]`)
//! to accept whatever value the observed URL carries for that key.

use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use url::form_urlencoded;

/// Query parameters as a multimap, values in URL order
pub type QueryMap = BTreeMap<String, Vec<String>>;

/// Characters left untouched when encoding a path-and-query for the agent
const AGENT_URL_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/')
    .remove(b'=')
    .remove(b'?')
    .remove(b'&');

/// Path and decoded query of a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
    pub path: String,
    pub query: QueryMap,
}

/// Split a URL (absolute or path-only) into path and query multimap.
///
/// Blank query values are dropped, `+` decodes to a space and
/// percent-escapes are decoded.
pub fn parse(url: &str) -> ParsedUrl {
    let url = url.trim();
    let without_fragment = url.split_once('#').map_or(url, |(head, _)| head);
    let (before_query, query) = without_fragment
        .split_once('?')
        .unwrap_or((without_fragment, ""));

    ParsedUrl {
        path: strip_origin(before_query).to_string(),
        query: parse_query(query),
    }
}

/// `http://host:port/path` -> `/path`; path-only input is returned unchanged
fn strip_origin(url: &str) -> &str {
    match url.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("", |i| &rest[i..]),
        None => url,
    }
}

fn parse_query(query: &str) -> QueryMap {
    let mut map = QueryMap::new();
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if value.is_empty() {
            continue;
        }
        map.entry(key.into_owned()).or_default().push(value.into_owned());
    }
    map
}

/// Whether a golden query value is a placeholder (`[...]`)
pub fn is_placeholder(value: &str) -> bool {
    value.len() >= 2 && value.starts_with('[') && value.ends_with(']')
}

/// Compare a golden URL against an observed one.
///
/// Paths must be identical. Every placeholder key takes the observed values
/// for that key (if the observed URL has it); after substitution both query
/// multimaps must be equal.
pub fn matches(golden_url: &str, observed_url: &str) -> bool {
    let golden = parse(golden_url);
    let observed = parse(observed_url);

    if golden.path != observed.path {
        return false;
    }

    let mut expected = golden.query;
    for (key, values) in expected.iter_mut() {
        let placeholder = values.first().is_some_and(|v| is_placeholder(v));
        if placeholder {
            if let Some(observed_values) = observed.query.get(key) {
                *values = observed_values.clone();
            }
        }
    }

    expected == observed.query
}

/// Turn a golden URL into a navigable one by unwrapping placeholder values.
///
/// `/checkout?cart=[{"id":"1"}]` becomes `/checkout?cart={"id":"1"}`.
/// Non-placeholder parameters are kept as written.
pub fn strip_placeholders(golden_url: &str) -> String {
    let golden_url = golden_url.trim();
    let Some((path, query)) = golden_url.split_once('?') else {
        return golden_url.to_string();
    };

    let params: Vec<String> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if is_placeholder(value) => {
                format!("{}={}", key, &value[1..value.len() - 1])
            }
            _ => pair.to_string(),
        })
        .collect();

    if params.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, params.join("&"))
    }
}

/// Percent-encode a path-and-query, leaving `/ = ? &` intact.
pub fn encode_for_agent(path_and_query: &str) -> String {
    utf8_percent_encode(path_and_query, AGENT_URL_ENCODE_SET).to_string()
}

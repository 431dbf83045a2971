//! Query-string parsing and request validation for the mark route.

use crate::error::{BestEffort, Failure};
use crate::session::SessionToken;
use std::borrow::Cow;
use std::collections::HashMap;

/// One query parameter as the endpoint sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Missing,
    Single(String),
    /// The key appeared more than once.
    Repeated(Vec<String>),
}

impl Field {
    pub fn single(&self) -> Option<&str> {
        match self {
            Field::Single(value) => Some(value),
            Field::Missing | Field::Repeated(_) => None,
        }
    }
}

/// Decoded query parameters, keeping every occurrence of each key.
#[derive(Debug, Default, Clone)]
pub struct Query {
    params: HashMap<String, Vec<String>>,
}

impl Query {
    /// Parse the query part of a request URL (with or without the path).
    pub fn parse(url: &str) -> Self {
        let query = url.split_once('?').map(|(_, q)| q).unwrap_or("");
        let query = query.split_once('#').map(|(q, _)| q).unwrap_or(query);

        let mut params: HashMap<String, Vec<String>> = HashMap::new();
        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            params
                .entry(decode_component(key).into_owned())
                .or_default()
                .push(decode_component(value).into_owned());
        }
        Self { params }
    }

    pub fn field(&self, key: &str) -> Field {
        match self.params.get(key).map(Vec::as_slice) {
            None | Some([]) => Field::Missing,
            Some([value]) => Field::Single(value.clone()),
            Some(values) => Field::Repeated(values.to_vec()),
        }
    }
}

/// Decode a form-encoded component: `+` is a space, bad escapes stay literal
/// and invalid UTF-8 is replaced.
fn decode_component(raw: &str) -> Cow<'_, str> {
    if !raw.contains(|c: char| c == '+' || c == '%') {
        return Cow::Borrowed(raw);
    }
    let spaced = raw.replace('+', " ");
    let bytes = urlencoding::decode_binary(spaced.as_bytes());
    Cow::Owned(String::from_utf8_lossy(&bytes).into_owned())
}

/// A request that passed token and shape validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedMark {
    /// Document identifier; empty asks the endpoint to infer the document.
    pub source: String,
    /// 1-based line number as sent. Parsed leniently when applied.
    pub line: String,
    pub checked: bool,
}

/// Validate a mark request, token first.
pub fn validate(query: &Query, token: &SessionToken) -> BestEffort<ValidatedMark> {
    match query.field("nonce").single() {
        Some(nonce) if token.verify(nonce) => {}
        _ => return Err(Failure::Authorization),
    }

    let source = query
        .field("source")
        .single()
        .ok_or(Failure::MalformedRequest("source"))?
        .to_string();
    let line = query
        .field("line")
        .single()
        .ok_or(Failure::MalformedRequest("line"))?
        .to_string();
    let checked = query.field("checked").single() == Some("true");

    Ok(ValidatedMark {
        source,
        line,
        checked,
    })
}

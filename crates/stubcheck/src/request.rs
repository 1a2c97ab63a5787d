//! Normalized request and response values exchanged with the HTTP listener.

use crate::stub::RequestParts;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Ordered multimap used for headers and query parameters.
///
/// Ordered keys keep rendered diagnostics stable between runs.
pub type Multimap = BTreeMap<String, Vec<String>>;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Trace,
    Connect,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
            Method::Connect => "CONNECT",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            "TRACE" => Ok(Method::Trace),
            "CONNECT" => Ok(Method::Connect),
            _ => Err(s.to_string()),
        }
    }
}

/// An inbound request as handed over by the listener.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRequest {
    pub method: Method,
    pub path: String,
    /// Header names as received; the builder and hyper adapter lowercase
    /// them and matching ignores their case
    pub headers: Multimap,
    pub query_parameters: Multimap,
    pub body: Bytes,
}

impl NormalizedRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Multimap::new(),
            query_parameters: Multimap::new(),
            body: Bytes::new(),
        }
    }

    /// Add a header value; the name is lowercased.
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into());
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_parameters
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    /// Merge parameters parsed from a raw query string.
    pub fn query_string(mut self, raw: &str) -> Self {
        for (key, values) in parse_query_string(raw) {
            self.query_parameters.entry(key).or_default().extend(values);
        }
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Body decoded as UTF-8, lossily.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Borrowed view for matching.
    pub fn parts(&self) -> RequestParts<'_> {
        RequestParts {
            method: self.method,
            path: &self.path,
            headers: &self.headers,
            query_parameters: &self.query_parameters,
            body: &self.body,
        }
    }
}

/// Parse `a=1&a=2&b=x%20y` into a multimap, preserving value order per key.
///
/// `+` decodes to a space; pairs without `=` get an empty value.
pub fn parse_query_string(query: &str) -> Multimap {
    let mut params = Multimap::new();
    for pair in query.trim_start_matches('?').split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        params
            .entry(decode_component(key))
            .or_default()
            .push(decode_component(value));
    }
    params
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

/// A response returned to the listener.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedResponse {
    pub status_code: u16,
    pub headers: Multimap,
    pub body: Bytes,
}

impl NormalizedResponse {
    pub fn header_values(&self, name: &str) -> Option<&Vec<String>> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

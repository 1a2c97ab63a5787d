//! Field matcher set: per-concern matchers combined into one request matcher.
//!
//! Each configured field is evaluated independently. Unconfigured fields are
//! always satisfied, and header/query matchers only inspect the keys they
//! declare. A declared key must be present; when it carries several values,
//! any one satisfying the matcher is enough.

use super::body::{BodyPattern, BodyView, CompiledBodyPattern};
use crate::error::ConfigError;
use crate::matcher::{CompiledCompositeMatcher, CompositeMatcher};
use crate::request::{Method, Multimap};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Request matching configuration shared by stubs and expectations.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequestMatcher {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<Method>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<CompositeMatcher>,

    /// Header matchers keyed by header name (case-insensitive)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, CompositeMatcher>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query_parameters: BTreeMap<String, CompositeMatcher>,

    /// All patterns must match
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub body_patterns: Vec<BodyPattern>,
}

impl RequestMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn path(mut self, matcher: impl Into<CompositeMatcher>) -> Self {
        self.path = Some(matcher.into());
        self
    }

    pub fn header(mut self, name: &str, matcher: impl Into<CompositeMatcher>) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), matcher.into());
        self
    }

    pub fn query(mut self, name: impl Into<String>, matcher: impl Into<CompositeMatcher>) -> Self {
        self.query_parameters.insert(name.into(), matcher.into());
        self
    }

    pub fn body(mut self, pattern: BodyPattern) -> Self {
        self.body_patterns.push(pattern);
        self
    }

    /// Whether no field is configured, i.e. every request matches.
    pub fn is_empty(&self) -> bool {
        self.method.is_none()
            && self.path.is_none()
            && self.headers.is_empty()
            && self.query_parameters.is_empty()
            && self.body_patterns.is_empty()
    }

    /// One `(field, description)` pair per configured field, in evaluation order.
    pub fn describe(&self) -> Vec<(Field, String)> {
        let mut lines = Vec::new();
        if let Some(method) = &self.method {
            lines.push((Field::Method, method.to_string()));
        }
        if let Some(path) = &self.path {
            lines.push((Field::Path, path.to_string()));
        }
        for (name, matcher) in &self.headers {
            lines.push((Field::Header(name.to_ascii_lowercase()), matcher.to_string()));
        }
        for (name, matcher) in &self.query_parameters {
            lines.push((Field::Query(name.clone()), matcher.to_string()));
        }
        for (i, pattern) in self.body_patterns.iter().enumerate() {
            lines.push((Field::Body(i), pattern.to_string()));
        }
        lines
    }
}

impl fmt::Display for RequestMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "any request");
        }
        let lines: Vec<String> = self
            .describe()
            .into_iter()
            .map(|(field, desc)| format!("{field}: {desc}"))
            .collect();
        write!(f, "{}", lines.join("\n"))
    }
}

/// The request field a matcher applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Method,
    Path,
    Header(String),
    Query(String),
    /// Index into the body pattern list
    Body(usize),
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Method => write!(f, "method"),
            Field::Path => write!(f, "path"),
            Field::Header(name) => write!(f, "header {name}"),
            Field::Query(name) => write!(f, "query {name}"),
            Field::Body(i) => write!(f, "body[{i}]"),
        }
    }
}

/// Expected-versus-actual outcome of one configured field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDiff {
    pub field: Field,
    /// Human-readable description of the matcher
    pub expected: String,
    /// Value the matcher saw; `None` when the field was absent
    pub actual: Option<String>,
    pub matched: bool,
    /// Literal body text expected by an `equals` body pattern, for line diffs
    pub expected_body: Option<String>,
}

/// Result of evaluating a request against a request matcher.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchEvaluation {
    pub fields: Vec<FieldDiff>,
}

impl MatchEvaluation {
    pub fn matches(&self) -> bool {
        self.fields.iter().all(|f| f.matched)
    }

    pub fn unmet_fields(&self) -> Vec<&FieldDiff> {
        self.fields.iter().filter(|f| !f.matched).collect()
    }

    pub fn unmet_count(&self) -> usize {
        self.fields.iter().filter(|f| !f.matched).count()
    }
}

/// Borrowed view over the parts of a request that matchers inspect.
#[derive(Debug, Clone, Copy)]
pub struct RequestParts<'a> {
    pub method: Method,
    pub path: &'a str,
    pub headers: &'a Multimap,
    pub query_parameters: &'a Multimap,
    pub body: &'a [u8],
}

#[derive(Debug, Clone)]
struct CompiledKeyMatcher {
    name: String,
    description: String,
    matcher: CompiledCompositeMatcher,
}

impl CompiledKeyMatcher {
    fn matches(&self, values: Option<&Vec<String>>) -> bool {
        values.is_some_and(|vs| vs.iter().any(|v| self.matcher.matches(v)))
    }
}

/// Header lookup by lowercase name. Keys inserted without the builder may
/// carry any case.
fn header_values<'a>(headers: &'a Multimap, name: &str) -> Option<&'a Vec<String>> {
    headers.get(name).or_else(|| {
        headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    })
}

#[derive(Debug, Clone)]
struct CompiledBodyEntry {
    description: String,
    expected_text: Option<String>,
    pattern: CompiledBodyPattern,
}

/// Compiled request matcher for efficient runtime evaluation.
#[derive(Debug, Clone)]
pub struct CompiledRequestMatcher {
    config: RequestMatcher,
    method: Option<Method>,
    path: Option<(String, CompiledCompositeMatcher)>,
    headers: Vec<CompiledKeyMatcher>,
    query: Vec<CompiledKeyMatcher>,
    body: Vec<CompiledBodyEntry>,
}

impl CompiledRequestMatcher {
    pub fn compile(config: &RequestMatcher) -> Result<Self, ConfigError> {
        let path = config
            .path
            .as_ref()
            .map(|m| Ok::<_, ConfigError>((m.to_string(), CompiledCompositeMatcher::compile(m, "path")?)))
            .transpose()?;

        let headers = config
            .headers
            .iter()
            .map(|(name, m)| {
                let name = name.to_ascii_lowercase();
                let field = format!("header {name}");
                Ok(CompiledKeyMatcher {
                    matcher: CompiledCompositeMatcher::compile(m, &field)?,
                    description: m.to_string(),
                    name,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let query = config
            .query_parameters
            .iter()
            .map(|(name, m)| {
                let field = format!("query {name}");
                Ok(CompiledKeyMatcher {
                    matcher: CompiledCompositeMatcher::compile(m, &field)?,
                    description: m.to_string(),
                    name: name.clone(),
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let body = config
            .body_patterns
            .iter()
            .enumerate()
            .map(|(i, p)| {
                Ok(CompiledBodyEntry {
                    pattern: CompiledBodyPattern::compile(p, &format!("body[{i}]"))?,
                    description: p.to_string(),
                    expected_text: p.expected_text().map(str::to_string),
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            config: config.clone(),
            method: config.method,
            path,
            headers,
            query,
            body,
        })
    }

    /// The configuration this matcher was compiled from.
    pub fn config(&self) -> &RequestMatcher {
        &self.config
    }

    /// Fast check that stops at the first unmet field.
    pub fn is_match(&self, request: &RequestParts<'_>) -> bool {
        if self.method.is_some_and(|m| m != request.method) {
            return false;
        }
        if let Some((_, path)) = &self.path {
            if !path.matches(request.path) {
                return false;
            }
        }
        if !self
            .headers
            .iter()
            .all(|h| h.matches(header_values(request.headers, &h.name)))
        {
            return false;
        }
        if !self
            .query
            .iter()
            .all(|q| q.matches(request.query_parameters.get(&q.name)))
        {
            return false;
        }
        if self.body.is_empty() {
            return true;
        }
        let text = String::from_utf8_lossy(request.body);
        let view = BodyView::new(&text);
        self.body.iter().all(|b| b.pattern.matches(&view))
    }

    /// Evaluate every configured field, recording expected and actual values.
    pub fn evaluate(&self, request: &RequestParts<'_>) -> MatchEvaluation {
        let mut fields = Vec::new();

        if let Some(method) = self.method {
            fields.push(FieldDiff {
                field: Field::Method,
                expected: method.to_string(),
                actual: Some(request.method.to_string()),
                matched: method == request.method,
                expected_body: None,
            });
        }

        if let Some((description, path)) = &self.path {
            fields.push(FieldDiff {
                field: Field::Path,
                expected: description.clone(),
                actual: Some(request.path.to_string()),
                matched: path.matches(request.path),
                expected_body: None,
            });
        }

        for h in &self.headers {
            let values = header_values(request.headers, &h.name);
            fields.push(FieldDiff {
                field: Field::Header(h.name.clone()),
                expected: h.description.clone(),
                actual: values.map(|vs| vs.join(", ")),
                matched: h.matches(values),
                expected_body: None,
            });
        }

        for q in &self.query {
            let values = request.query_parameters.get(&q.name);
            fields.push(FieldDiff {
                field: Field::Query(q.name.clone()),
                expected: q.description.clone(),
                actual: values.map(|vs| vs.join(", ")),
                matched: q.matches(values),
                expected_body: None,
            });
        }

        if !self.body.is_empty() {
            let text = String::from_utf8_lossy(request.body);
            let view = BodyView::new(&text);
            for (i, b) in self.body.iter().enumerate() {
                fields.push(FieldDiff {
                    field: Field::Body(i),
                    expected: b.description.clone(),
                    actual: b.pattern.actual(&view),
                    matched: b.pattern.matches(&view),
                    expected_body: b.expected_text.clone(),
                });
            }
        }

        MatchEvaluation { fields }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::NormalizedRequest;
    use serde_json::json;

    fn compile(config: RequestMatcher) -> CompiledRequestMatcher {
        CompiledRequestMatcher::compile(&config).unwrap()
    }

    #[test]
    fn test_empty_matcher_matches_any_request() {
        let matcher = compile(RequestMatcher::new());
        let req = NormalizedRequest::new(Method::Delete, "/anything").body("x");
        assert!(matcher.is_match(&req.parts()));
        assert!(matcher.evaluate(&req.parts()).fields.is_empty());
    }

    #[test]
    fn test_all_fields_must_match() {
        let matcher = compile(
            RequestMatcher::new()
                .method(Method::Post)
                .path("/users")
                .header("Content-Type", CompositeMatcher::containing("json"))
                .query("dryRun", "true")
                .body(BodyPattern::json_path("$.name", "ada")),
        );

        let good = NormalizedRequest::new(Method::Post, "/users")
            .header("content-type", "application/json")
            .query("dryRun", "true")
            .body(r#"{"name": "ada"}"#);
        assert!(matcher.is_match(&good.parts()));
        assert!(matcher.evaluate(&good.parts()).matches());

        let bad = NormalizedRequest::new(Method::Put, "/users")
            .query("dryRun", "false")
            .body(r#"{"name": "ada"}"#);
        assert!(!matcher.is_match(&bad.parts()));
        let eval = matcher.evaluate(&bad.parts());
        let unmet: Vec<Field> = eval.unmet_fields().iter().map(|f| f.field.clone()).collect();
        assert_eq!(
            unmet,
            vec![
                Field::Method,
                Field::Header("content-type".to_string()),
                Field::Query("dryRun".to_string()),
            ]
        );
    }

    #[test]
    fn test_undeclared_keys_unconstrained() {
        let matcher = compile(RequestMatcher::new().header("x-id", "1"));
        let req = NormalizedRequest::new(Method::Get, "/")
            .header("x-id", "1")
            .header("x-other", "whatever");
        assert!(matcher.is_match(&req.parts()));
    }

    #[test]
    fn test_declared_key_must_be_present() {
        let matcher = compile(RequestMatcher::new().query("page", CompositeMatcher::not_equal_to("0")));
        let req = NormalizedRequest::new(Method::Get, "/");
        assert!(!matcher.is_match(&req.parts()));

        let eval = matcher.evaluate(&req.parts());
        assert_eq!(eval.unmet_count(), 1);
        assert_eq!(eval.fields[0].actual, None);
    }

    #[test]
    fn test_multivalue_any_value_matches() {
        let matcher = compile(RequestMatcher::new().query("tag", "b"));
        let req = NormalizedRequest::new(Method::Get, "/").query_string("tag=a&tag=b");
        assert!(matcher.is_match(&req.parts()));
    }

    #[test]
    fn test_header_names_case_insensitive() {
        let matcher = compile(RequestMatcher::new().header("X-Trace-Id", "abc"));
        let req = NormalizedRequest::new(Method::Get, "/").header("X-TRACE-ID", "abc");
        assert!(matcher.is_match(&req.parts()));
    }

    #[test]
    fn test_mixed_case_header_keys_inserted_directly() {
        let matcher = compile(RequestMatcher::new().header("Content-Type", "application/json"));
        let mut req = NormalizedRequest::new(Method::Post, "/");
        req.headers
            .insert("Content-Type".to_string(), vec!["application/json".to_string()]);

        assert!(matcher.is_match(&req.parts()));
        let eval = matcher.evaluate(&req.parts());
        assert!(eval.matches());
        assert_eq!(eval.fields[0].actual.as_deref(), Some("application/json"));
    }

    #[test]
    fn test_body_patterns_all_must_match() {
        let matcher = compile(
            RequestMatcher::new()
                .body(BodyPattern::text(CompositeMatcher::containing("ada")))
                .body(BodyPattern::json_containing(json!({"role": "admin"}))),
        );
        let both = NormalizedRequest::new(Method::Post, "/").body(r#"{"name":"ada","role":"admin"}"#);
        let one = NormalizedRequest::new(Method::Post, "/").body(r#"{"name":"ada","role":"user"}"#);
        assert!(matcher.is_match(&both.parts()));
        assert!(!matcher.is_match(&one.parts()));
        assert_eq!(matcher.evaluate(&one.parts()).unmet_fields()[0].field, Field::Body(1));
    }

    #[test]
    fn test_is_match_agrees_with_evaluate() {
        let matcher = compile(
            RequestMatcher::new()
                .method(Method::Get)
                .path(CompositeMatcher::matching("/users/\\d+")),
        );
        for (method, path) in [
            (Method::Get, "/users/1"),
            (Method::Get, "/users/x"),
            (Method::Post, "/users/1"),
        ] {
            let req = NormalizedRequest::new(method, path);
            assert_eq!(
                matcher.is_match(&req.parts()),
                matcher.evaluate(&req.parts()).matches()
            );
        }
    }

    #[test]
    fn test_request_matcher_serde() {
        let config: RequestMatcher = serde_json::from_value(json!({
            "method": "GET",
            "path": {"matches": "/orders/.*"},
            "headers": {"accept": {"contains": "json"}},
            "queryParameters": {"limit": {"equals": "10"}},
            "bodyPatterns": [{"contains": "x"}]
        }))
        .unwrap();
        assert_eq!(config.method, Some(Method::Get));
        assert_eq!(config.headers.len(), 1);
        assert_eq!(config.query_parameters.len(), 1);
        assert_eq!(config.body_patterns.len(), 1);
    }

    #[test]
    fn test_display_lists_fields() {
        let config = RequestMatcher::new().method(Method::Get).path("/health");
        assert_eq!(config.to_string(), "method: GET\npath: equals \"/health\"");
        assert_eq!(RequestMatcher::new().to_string(), "any request");
    }
}

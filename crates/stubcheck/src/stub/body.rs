//! Body patterns.
//!
//! Supports matching the raw body text as well as JSON-aware patterns. The
//! JSON view of a body is parsed lazily, at most once per evaluation, and a
//! body that is not valid JSON simply fails every JSON pattern.

use crate::error::ConfigError;
use crate::matcher::{CompiledCompositeMatcher, CompositeMatcher};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::cell::OnceCell;
use std::fmt;

/// Body pattern configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum BodyPattern {
    /// Extract values with a `$.a.b[0]` path and apply a matcher to them
    JsonPath {
        path: String,
        matcher: CompositeMatcher,
    },

    /// Structural JSON equality
    EqualToJson {
        json: Value,
        /// Allow objects in the body to carry keys the pattern doesn't name
        #[serde(rename = "ignoreExtraElements", default)]
        ignore_extra_elements: bool,
    },

    /// Matcher applied to the raw body text
    #[serde(untagged)]
    Text(CompositeMatcher),
}

impl BodyPattern {
    pub fn text(matcher: impl Into<CompositeMatcher>) -> Self {
        BodyPattern::Text(matcher.into())
    }

    pub fn json_path(path: impl Into<String>, matcher: impl Into<CompositeMatcher>) -> Self {
        BodyPattern::JsonPath {
            path: path.into(),
            matcher: matcher.into(),
        }
    }

    pub fn equal_to_json(json: Value) -> Self {
        BodyPattern::EqualToJson {
            json,
            ignore_extra_elements: false,
        }
    }

    pub fn json_containing(json: Value) -> Self {
        BodyPattern::EqualToJson {
            json,
            ignore_extra_elements: true,
        }
    }

    /// The literal text an `equals` leaf expects, for diff rendering.
    pub(crate) fn expected_text(&self) -> Option<&str> {
        match self {
            BodyPattern::Text(CompositeMatcher::Leaf(m)) => m.equals.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for BodyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyPattern::Text(m) => write!(f, "{m}"),
            BodyPattern::JsonPath { path, matcher } => write!(f, "{path} {matcher}"),
            BodyPattern::EqualToJson {
                json,
                ignore_extra_elements,
            } => {
                if *ignore_extra_elements {
                    write!(f, "JSON containing {json}")
                } else {
                    write!(f, "JSON equal to {json}")
                }
            }
        }
    }
}

/// One step of a compiled JSON path.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Key(String),
    Index(usize),
    Wildcard,
}

/// Compiled body pattern for efficient runtime evaluation.
#[derive(Debug, Clone)]
pub enum CompiledBodyPattern {
    Text(CompiledCompositeMatcher),
    JsonPath {
        segments: Vec<Segment>,
        matcher: CompiledCompositeMatcher,
    },
    EqualToJson {
        json: Value,
        ignore_extra_elements: bool,
    },
}

impl CompiledBodyPattern {
    pub fn compile(pattern: &BodyPattern, field: &str) -> Result<Self, ConfigError> {
        match pattern {
            BodyPattern::Text(m) => Ok(CompiledBodyPattern::Text(
                CompiledCompositeMatcher::compile(m, field)?,
            )),
            BodyPattern::JsonPath { path, matcher } => Ok(CompiledBodyPattern::JsonPath {
                segments: parse_json_path(path)?,
                matcher: CompiledCompositeMatcher::compile(matcher, field)?,
            }),
            BodyPattern::EqualToJson {
                json,
                ignore_extra_elements,
            } => Ok(CompiledBodyPattern::EqualToJson {
                json: json.clone(),
                ignore_extra_elements: *ignore_extra_elements,
            }),
        }
    }

    pub fn matches(&self, body: &BodyView<'_>) -> bool {
        match self {
            CompiledBodyPattern::Text(m) => m.matches(body.text),
            CompiledBodyPattern::JsonPath { segments, matcher } => body
                .json()
                .map(|json| {
                    select(json, segments)
                        .into_iter()
                        .any(|v| matcher.matches(&scalar_text(v)))
                })
                .unwrap_or(false),
            CompiledBodyPattern::EqualToJson {
                json,
                ignore_extra_elements,
            } => body
                .json()
                .is_some_and(|actual| json_equals(actual, json, *ignore_extra_elements)),
        }
    }

    /// What this pattern looked at in the body, for diagnostics.
    pub fn actual(&self, body: &BodyView<'_>) -> Option<String> {
        match self {
            CompiledBodyPattern::Text(_) => Some(body.text.to_string()),
            CompiledBodyPattern::JsonPath { segments, .. } => {
                let Some(json) = body.json() else {
                    return Some("<body is not valid JSON>".to_string());
                };
                let values: Vec<String> = select(json, segments)
                    .into_iter()
                    .map(|v| scalar_text(v))
                    .collect();
                if values.is_empty() {
                    None
                } else {
                    Some(values.join(", "))
                }
            }
            CompiledBodyPattern::EqualToJson { .. } => match body.json() {
                Some(json) => Some(json.to_string()),
                None => Some(body.text.to_string()),
            },
        }
    }
}

/// A request body with a lazily parsed JSON view.
pub struct BodyView<'a> {
    pub text: &'a str,
    json: OnceCell<Option<Value>>,
}

impl<'a> BodyView<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            json: OnceCell::new(),
        }
    }

    pub fn json(&self) -> Option<&Value> {
        self.json
            .get_or_init(|| serde_json::from_str(self.text).ok())
            .as_ref()
    }
}

fn parse_json_path(path: &str) -> Result<Vec<Segment>, ConfigError> {
    let invalid = || ConfigError::InvalidJsonPath(path.to_string());
    let rest = path.strip_prefix('$').ok_or_else(invalid)?;

    let mut segments = Vec::new();
    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '.' => {
                let mut key = String::new();
                while let Some(&next) = chars.peek() {
                    if next == '.' || next == '[' {
                        break;
                    }
                    key.push(next);
                    chars.next();
                }
                // `$.items.[0]` is accepted as `$.items[0]`
                if key.is_empty() {
                    if chars.peek() == Some(&'[') {
                        continue;
                    }
                    return Err(invalid());
                }
                segments.push(if key == "*" {
                    Segment::Wildcard
                } else {
                    Segment::Key(key)
                });
            }
            '[' => {
                let mut inner = String::new();
                let mut closed = false;
                for next in chars.by_ref() {
                    if next == ']' {
                        closed = true;
                        break;
                    }
                    inner.push(next);
                }
                if !closed {
                    return Err(invalid());
                }
                let inner = inner.trim();
                if inner == "*" {
                    segments.push(Segment::Wildcard);
                } else if let Some(quoted) = inner
                    .strip_prefix('\'')
                    .and_then(|s| s.strip_suffix('\''))
                {
                    segments.push(Segment::Key(quoted.to_string()));
                } else {
                    let index = inner.parse::<usize>().map_err(|_| invalid())?;
                    segments.push(Segment::Index(index));
                }
            }
            _ => return Err(invalid()),
        }
    }
    Ok(segments)
}

fn select<'v>(root: &'v Value, segments: &[Segment]) -> Vec<&'v Value> {
    let mut current = vec![root];
    for segment in segments {
        let mut next = Vec::new();
        for value in current {
            match (segment, value) {
                (Segment::Key(k), Value::Object(map)) => next.extend(map.get(k)),
                (Segment::Index(i), Value::Array(items)) => next.extend(items.get(*i)),
                (Segment::Wildcard, Value::Array(items)) => next.extend(items.iter()),
                (Segment::Wildcard, Value::Object(map)) => next.extend(map.values()),
                _ => {}
            }
        }
        current = next;
    }
    current
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_equals(actual: &Value, expected: &Value, ignore_extra: bool) -> bool {
    match (actual, expected) {
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|(x, y)| json_equals(x, y, ignore_extra))
        }
        (Value::Object(a), Value::Object(b)) => {
            (ignore_extra || a.len() == b.len())
                && b.iter().all(|(key, expected_val)| {
                    a.get(key)
                        .is_some_and(|actual_val| json_equals(actual_val, expected_val, ignore_extra))
                })
        }
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        _ => actual == expected,
    }
}

// Integers compare exactly. Only a float on either side goes through f64.
fn numbers_equal(a: &Number, b: &Number) -> bool {
    if a.is_f64() || b.is_f64() {
        return match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        };
    }
    match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => x == y,
        _ => a.as_u64().is_some() && a.as_u64() == b.as_u64(),
    }
}

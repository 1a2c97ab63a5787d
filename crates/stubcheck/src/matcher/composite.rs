//! Boolean combinators over string matchers.

use super::string_matcher::{CompiledStringMatcher, StringMatcher};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A tree of string matchers joined by AND/OR.
///
/// Serialized as `{"and": [left, right]}`, `{"or": [left, right]}`, or a bare
/// string matcher object for a leaf.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum CompositeMatcher {
    /// Matches if both sides match
    And(Box<CompositeMatcher>, Box<CompositeMatcher>),

    /// Matches if either side matches
    Or(Box<CompositeMatcher>, Box<CompositeMatcher>),

    /// A leaf string matcher
    #[serde(untagged)]
    Leaf(StringMatcher),
}

impl Default for CompositeMatcher {
    fn default() -> Self {
        CompositeMatcher::Leaf(StringMatcher::any())
    }
}

impl CompositeMatcher {
    pub fn equal_to(value: impl Into<String>) -> Self {
        StringMatcher::equal_to(value).into()
    }

    pub fn not_equal_to(value: impl Into<String>) -> Self {
        StringMatcher::not_equal_to(value).into()
    }

    pub fn matching(pattern: impl Into<String>) -> Self {
        StringMatcher::matching(pattern).into()
    }

    pub fn not_matching(pattern: impl Into<String>) -> Self {
        StringMatcher::not_matching(pattern).into()
    }

    pub fn containing(value: impl Into<String>) -> Self {
        StringMatcher::containing(value).into()
    }

    pub fn not_containing(value: impl Into<String>) -> Self {
        StringMatcher::not_containing(value).into()
    }

    pub fn and(self, other: impl Into<CompositeMatcher>) -> Self {
        CompositeMatcher::And(Box::new(self), Box::new(other.into()))
    }

    pub fn or(self, other: impl Into<CompositeMatcher>) -> Self {
        CompositeMatcher::Or(Box::new(self), Box::new(other.into()))
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompositeMatcher::Leaf(_) => write!(f, "{self}"),
            _ => write!(f, "({self})"),
        }
    }
}

impl From<StringMatcher> for CompositeMatcher {
    fn from(matcher: StringMatcher) -> Self {
        CompositeMatcher::Leaf(matcher)
    }
}

impl From<&str> for CompositeMatcher {
    /// A bare string means exact equality.
    fn from(value: &str) -> Self {
        CompositeMatcher::equal_to(value)
    }
}

impl fmt::Display for CompositeMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompositeMatcher::Leaf(m) => write!(f, "{m}"),
            CompositeMatcher::And(l, r) => {
                l.fmt_operand(f)?;
                write!(f, " AND ")?;
                r.fmt_operand(f)
            }
            CompositeMatcher::Or(l, r) => {
                l.fmt_operand(f)?;
                write!(f, " OR ")?;
                r.fmt_operand(f)
            }
        }
    }
}

/// Compiled composite matcher for efficient runtime evaluation.
#[derive(Debug, Clone)]
pub enum CompiledCompositeMatcher {
    And(Box<CompiledCompositeMatcher>, Box<CompiledCompositeMatcher>),
    Or(Box<CompiledCompositeMatcher>, Box<CompiledCompositeMatcher>),
    Leaf(CompiledStringMatcher),
}

impl CompiledCompositeMatcher {
    pub fn compile(matcher: &CompositeMatcher, field: &str) -> Result<Self, ConfigError> {
        match matcher {
            CompositeMatcher::And(l, r) => Ok(CompiledCompositeMatcher::And(
                Box::new(Self::compile(l, field)?),
                Box::new(Self::compile(r, field)?),
            )),
            CompositeMatcher::Or(l, r) => Ok(CompiledCompositeMatcher::Or(
                Box::new(Self::compile(l, field)?),
                Box::new(Self::compile(r, field)?),
            )),
            CompositeMatcher::Leaf(m) => Ok(CompiledCompositeMatcher::Leaf(
                CompiledStringMatcher::compile(m, field)?,
            )),
        }
    }

    /// Evaluate the tree, short-circuiting both combinators.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            CompiledCompositeMatcher::And(l, r) => l.matches(value) && r.matches(value),
            CompiledCompositeMatcher::Or(l, r) => l.matches(value) || r.matches(value),
            CompiledCompositeMatcher::Leaf(m) => m.matches(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(matcher: &CompositeMatcher) -> CompiledCompositeMatcher {
        CompiledCompositeMatcher::compile(matcher, "test").unwrap()
    }

    #[test]
    fn test_and() {
        let matcher = compile(
            &CompositeMatcher::containing("api").and(CompositeMatcher::not_containing("admin")),
        );
        assert!(matcher.matches("/api/users"));
        assert!(!matcher.matches("/api/admin"));
        assert!(!matcher.matches("/users"));
    }

    #[test]
    fn test_or() {
        let matcher = compile(&CompositeMatcher::equal_to("foo").or("bar"));
        assert!(matcher.matches("foo"));
        assert!(matcher.matches("bar"));
        assert!(!matcher.matches("baz"));
    }

    #[test]
    fn test_nested() {
        // (foo OR bar) AND NOT contains "x"
        let matcher = compile(
            &CompositeMatcher::matching("fo+")
                .or("bar")
                .and(CompositeMatcher::not_containing("x")),
        );
        assert!(matcher.matches("fooo"));
        assert!(matcher.matches("bar"));
        assert!(!matcher.matches("baz"));
    }

    #[test]
    fn test_invalid_regex_in_branch_fails_compile() {
        let matcher = CompositeMatcher::equal_to("a").or(CompositeMatcher::matching("[z-a]"));
        assert!(CompiledCompositeMatcher::compile(&matcher, "header x-id").is_err());
    }

    #[test]
    fn test_serde_shapes() {
        let json = r#"{"or": [{"equals": "a"}, {"and": [{"contains": "b"}, {"notContains": "c"}]}]}"#;
        let matcher: CompositeMatcher = serde_json::from_str(json).unwrap();
        assert_eq!(
            matcher,
            CompositeMatcher::equal_to("a")
                .or(CompositeMatcher::containing("b").and(CompositeMatcher::not_containing("c")))
        );

        let leaf: CompositeMatcher = serde_json::from_str(r#"{"equals": "a"}"#).unwrap();
        assert_eq!(leaf, CompositeMatcher::equal_to("a"));
    }

    #[test]
    fn test_display_parenthesizes_nested() {
        let matcher = CompositeMatcher::equal_to("a").or(CompositeMatcher::containing("b")
            .and(CompositeMatcher::not_containing("c")));
        assert_eq!(
            matcher.to_string(),
            r#"equals "a" OR (contains "b" AND not contains "c")"#
        );
    }
}

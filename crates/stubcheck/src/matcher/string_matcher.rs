//! Leaf string predicates.
//!
//! A [`StringMatcher`] is a conjunction of optional comparisons. Unset
//! comparisons are vacuously true, so an empty matcher matches any value.
//! Regex comparisons test the whole value, not a substring: `matches: "ab"`
//! rejects `"xaby"` while `contains: "ab"` accepts it.

use super::cached::CachedValue;
use crate::error::ConfigError;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// String matching configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StringMatcher {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_equals: Option<String>,

    /// Regex that must match the whole value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matches: Option<String>,

    /// Regex that must not match the whole value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_matches: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_contains: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub ignore_case: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl StringMatcher {
    /// A matcher with no comparisons; it accepts every value.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn equal_to(value: impl Into<String>) -> Self {
        Self {
            equals: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn not_equal_to(value: impl Into<String>) -> Self {
        Self {
            not_equals: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn matching(pattern: impl Into<String>) -> Self {
        Self {
            matches: Some(pattern.into()),
            ..Self::default()
        }
    }

    pub fn not_matching(pattern: impl Into<String>) -> Self {
        Self {
            not_matches: Some(pattern.into()),
            ..Self::default()
        }
    }

    pub fn containing(value: impl Into<String>) -> Self {
        Self {
            contains: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn not_containing(value: impl Into<String>) -> Self {
        Self {
            not_contains: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn ignoring_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    /// Whether no comparison is configured.
    pub fn is_unconstrained(&self) -> bool {
        self.equals.is_none()
            && self.not_equals.is_none()
            && self.matches.is_none()
            && self.not_matches.is_none()
            && self.contains.is_none()
            && self.not_contains.is_none()
    }
}

impl fmt::Display for StringMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(v) = &self.equals {
            parts.push(format!("equals {v:?}"));
        }
        if let Some(v) = &self.not_equals {
            parts.push(format!("not equals {v:?}"));
        }
        if let Some(v) = &self.matches {
            parts.push(format!("matches /{v}/"));
        }
        if let Some(v) = &self.not_matches {
            parts.push(format!("not matches /{v}/"));
        }
        if let Some(v) = &self.contains {
            parts.push(format!("contains {v:?}"));
        }
        if let Some(v) = &self.not_contains {
            parts.push(format!("not contains {v:?}"));
        }
        if parts.is_empty() {
            return write!(f, "any value");
        }
        write!(f, "{}", parts.join(" and "))?;
        if self.ignore_case {
            write!(f, " (ignore case)")?;
        }
        Ok(())
    }
}

/// A single compiled comparison.
#[derive(Debug, Clone)]
enum Check {
    Equals(CachedValue),
    NotEquals(CachedValue),
    Matches(Arc<Regex>),
    NotMatches(Arc<Regex>),
    Contains(CachedValue),
    NotContains(CachedValue),
}

/// Compiled string matcher for efficient runtime evaluation.
#[derive(Debug, Clone)]
pub struct CompiledStringMatcher {
    checks: Vec<Check>,
    ignore_case: bool,
}

impl CompiledStringMatcher {
    /// Compile a StringMatcher, anchoring regexes for full-match semantics.
    ///
    /// `field` names the matcher's location for error messages.
    pub fn compile(matcher: &StringMatcher, field: &str) -> Result<Self, ConfigError> {
        let ignore_case = matcher.ignore_case;
        let mut checks = Vec::new();

        if let Some(v) = &matcher.equals {
            checks.push(Check::Equals(CachedValue::new(v.as_str())));
        }
        if let Some(v) = &matcher.not_equals {
            checks.push(Check::NotEquals(CachedValue::new(v.as_str())));
        }
        if let Some(p) = &matcher.matches {
            checks.push(Check::Matches(compile_full_match(p, ignore_case, field)?));
        }
        if let Some(p) = &matcher.not_matches {
            checks.push(Check::NotMatches(compile_full_match(
                p,
                ignore_case,
                field,
            )?));
        }
        if let Some(v) = &matcher.contains {
            checks.push(Check::Contains(CachedValue::new(v.as_str())));
        }
        if let Some(v) = &matcher.not_contains {
            checks.push(Check::NotContains(CachedValue::new(v.as_str())));
        }

        Ok(Self {
            checks,
            ignore_case,
        })
    }

    /// Check if a value satisfies every configured comparison.
    pub fn matches(&self, value: &str) -> bool {
        let ic = self.ignore_case;
        self.checks.iter().all(|check| match check {
            Check::Equals(cached) => cached.equals(value, ic),
            Check::NotEquals(cached) => !cached.equals(value, ic),
            Check::Matches(regex) => regex.is_match(value),
            Check::NotMatches(regex) => !regex.is_match(value),
            Check::Contains(cached) => cached.contained_in(value, ic),
            Check::NotContains(cached) => !cached.contained_in(value, ic),
        })
    }

    pub fn is_unconstrained(&self) -> bool {
        self.checks.is_empty()
    }
}

fn compile_full_match(
    pattern: &str,
    ignore_case: bool,
    field: &str,
) -> Result<Arc<Regex>, ConfigError> {
    // `a)(b` becomes valid once wrapped, so the raw pattern is checked first.
    let anchored = format!("^(?:{pattern})$");
    Regex::new(pattern)
        .and_then(|_| {
            RegexBuilder::new(&anchored)
                .case_insensitive(ignore_case)
                .build()
        })
        .map(Arc::new)
        .map_err(|source| ConfigError::InvalidRegex {
            field: field.to_string(),
            pattern: pattern.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn compile(matcher: StringMatcher) -> CompiledStringMatcher {
        CompiledStringMatcher::compile(&matcher, "test").unwrap()
    }

    #[test]
    fn test_equals_respects_ignore_case() {
        let strict = compile(StringMatcher::equal_to("X"));
        assert!(strict.matches("X"));
        assert!(!strict.matches("x"));

        let relaxed = compile(StringMatcher::equal_to("X").ignoring_case());
        assert!(relaxed.matches("x"));
        assert!(relaxed.matches("X"));
    }

    #[test]
    fn test_contains_and_not_contains() {
        assert!(compile(StringMatcher::containing("ab")).matches("xaby"));
        assert!(!compile(StringMatcher::not_containing("ab")).matches("xaby"));
        assert!(compile(StringMatcher::not_containing("ab")).matches("xy"));
    }

    #[test]
    fn test_regex_is_full_match() {
        let matcher = compile(StringMatcher::matching("ab"));
        assert!(!matcher.matches("xaby"));
        assert!(matcher.matches("ab"));

        assert!(compile(StringMatcher::containing("ab")).matches("xaby"));
    }

    #[test]
    fn test_regex_alternation_stays_anchored() {
        // Without the group, "^a|b$" would accept "axx".
        let matcher = compile(StringMatcher::matching("a|b"));
        assert!(matcher.matches("a"));
        assert!(matcher.matches("b"));
        assert!(!matcher.matches("axx"));
    }

    #[test]
    fn test_not_matches() {
        let matcher = compile(StringMatcher::not_matching(r"/users/\d+"));
        assert!(!matcher.matches("/users/42"));
        assert!(matcher.matches("/users/42/orders"));
    }

    #[test]
    fn test_regex_ignore_case_flag() {
        let matcher = compile(StringMatcher::matching("/API/.*").ignoring_case());
        assert!(matcher.matches("/api/v1"));
    }

    #[test]
    fn test_negated_comparisons_respect_ignore_case() {
        let not_equal = compile(StringMatcher::not_equal_to("X").ignoring_case());
        assert!(!not_equal.matches("x"));
        assert!(not_equal.matches("y"));
        assert!(compile(StringMatcher::not_equal_to("X")).matches("x"));

        let not_contain = compile(StringMatcher::not_containing("AB").ignoring_case());
        assert!(!not_contain.matches("xaby"));
        assert!(not_contain.matches("xy"));
        assert!(compile(StringMatcher::not_containing("AB")).matches("xaby"));

        let not_match = compile(StringMatcher::not_matching("/API/.*").ignoring_case());
        assert!(!not_match.matches("/api/v1"));
        assert!(not_match.matches("/web/v1"));
        assert!(compile(StringMatcher::not_matching("/API/.*")).matches("/api/v1"));
    }

    #[test]
    fn test_conjunction_of_comparisons() {
        let matcher = compile(StringMatcher {
            contains: Some("order".to_string()),
            not_equals: Some("/orders".to_string()),
            ..StringMatcher::default()
        });
        assert!(matcher.matches("/orders/1"));
        assert!(!matcher.matches("/orders"));
        assert!(!matcher.matches("/users"));
    }

    #[test]
    fn test_empty_matcher_matches_everything() {
        let matcher = compile(StringMatcher::any());
        assert!(matcher.is_unconstrained());
        assert!(matcher.matches(""));
        assert!(matcher.matches("anything"));
    }

    #[test]
    fn test_invalid_regex_is_config_error() {
        let err = CompiledStringMatcher::compile(&StringMatcher::matching("(unclosed"), "path")
            .unwrap_err();
        match err {
            ConfigError::InvalidRegex { field, pattern, .. } => {
                assert_eq!(field, "path");
                assert_eq!(pattern, "(unclosed");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_string_matcher_serde() {
        let json = r#"{"equals": "GET", "ignoreCase": true}"#;
        let matcher: StringMatcher = serde_json::from_str(json).unwrap();
        assert_eq!(matcher, StringMatcher::equal_to("GET").ignoring_case());

        let json = r#"{"notMatches": "^/internal/.*"}"#;
        let matcher: StringMatcher = serde_json::from_str(json).unwrap();
        assert_eq!(matcher, StringMatcher::not_matching("^/internal/.*"));
    }

    #[test]
    fn test_unknown_comparison_rejected() {
        assert!(serde_json::from_str::<StringMatcher>(r#"{"startsWith": "/api"}"#).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(StringMatcher::equal_to("X").to_string(), r#"equals "X""#);
        assert_eq!(
            StringMatcher::matching("a.*").ignoring_case().to_string(),
            "matches /a.*/ (ignore case)"
        );
        assert_eq!(StringMatcher::any().to_string(), "any value");
    }

    proptest! {
        #[test]
        fn prop_equals_matches_itself(s in ".*") {
            prop_assert!(compile(StringMatcher::equal_to(s.clone())).matches(&s));
        }

        #[test]
        fn prop_negations_are_complements(s in "[a-z]{0,8}", needle in "[a-z]{1,3}") {
            let contains = compile(StringMatcher::containing(needle.clone())).matches(&s);
            let not_contains = compile(StringMatcher::not_containing(needle)).matches(&s);
            prop_assert_ne!(contains, not_contains);
        }

        #[test]
        fn prop_literal_regex_equals_full_string(s in "[a-z]{0,8}", t in "[a-z]{0,8}") {
            let regex = compile(StringMatcher::matching(regex::escape(&s))).matches(&t);
            prop_assert_eq!(regex, s == t);
        }
    }
}

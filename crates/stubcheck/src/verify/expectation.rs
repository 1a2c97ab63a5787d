//! Expectation descriptors built by test code.

use crate::matcher::CompositeMatcher;
use crate::request::Method;
use crate::stub::{BodyPattern, RequestMatcher};
use std::fmt;

/// Cardinality policy of an expectation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    ExactlyOnce,
    AtLeastOnce,
    ExactCount(usize),
}

impl Quantifier {
    pub fn is_satisfied_by(&self, count: usize) -> bool {
        match self {
            Quantifier::ExactlyOnce => count == 1,
            Quantifier::AtLeastOnce => count >= 1,
            Quantifier::ExactCount(n) => count == *n,
        }
    }
}

impl fmt::Display for Quantifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantifier::ExactlyOnce => write!(f, "exactly 1 request"),
            Quantifier::AtLeastOnce => write!(f, "at least 1 request"),
            Quantifier::ExactCount(1) => write!(f, "exactly 1 request"),
            Quantifier::ExactCount(n) => write!(f, "exactly {n} requests"),
        }
    }
}

/// What an expectation's requests must look like.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpectationTarget {
    Pattern(RequestMatcher),
    /// Reuse a registered stub's request matcher, optionally narrowed further
    Stub {
        name: String,
        refinement: RequestMatcher,
    },
}

/// Requests an endpoint should have received, with a cardinality policy.
///
/// ```
/// use stubcheck::{ExpectationDescriptor, Method};
///
/// let expectation = ExpectationDescriptor::new()
///     .method(Method::Post)
///     .path("/payments")
///     .exactly_once()
///     .exclusive();
/// assert!(expectation.is_exclusive());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectationDescriptor {
    target: ExpectationTarget,
    quantifier: Quantifier,
    exclusive: bool,
}

impl Default for ExpectationDescriptor {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpectationDescriptor {
    /// Expect at least one request of any shape until narrowed.
    pub fn new() -> Self {
        Self::matching(RequestMatcher::new())
    }

    pub fn matching(pattern: RequestMatcher) -> Self {
        Self {
            target: ExpectationTarget::Pattern(pattern),
            quantifier: Quantifier::AtLeastOnce,
            exclusive: false,
        }
    }

    /// Expect requests matching the stub registered under `name`.
    pub fn for_stub(name: impl Into<String>) -> Self {
        Self {
            target: ExpectationTarget::Stub {
                name: name.into(),
                refinement: RequestMatcher::new(),
            },
            quantifier: Quantifier::AtLeastOnce,
            exclusive: false,
        }
    }

    fn pattern_mut(&mut self) -> &mut RequestMatcher {
        match &mut self.target {
            ExpectationTarget::Pattern(pattern) => pattern,
            ExpectationTarget::Stub { refinement, .. } => refinement,
        }
    }

    fn with_pattern(mut self, f: impl FnOnce(RequestMatcher) -> RequestMatcher) -> Self {
        let pattern = std::mem::take(self.pattern_mut());
        *self.pattern_mut() = f(pattern);
        self
    }

    pub fn method(self, method: Method) -> Self {
        self.with_pattern(|p| p.method(method))
    }

    pub fn path(self, matcher: impl Into<CompositeMatcher>) -> Self {
        let matcher = matcher.into();
        self.with_pattern(|p| p.path(matcher))
    }

    pub fn header(self, name: &str, matcher: impl Into<CompositeMatcher>) -> Self {
        let matcher = matcher.into();
        self.with_pattern(|p| p.header(name, matcher))
    }

    pub fn query(self, name: impl Into<String>, matcher: impl Into<CompositeMatcher>) -> Self {
        let (name, matcher) = (name.into(), matcher.into());
        self.with_pattern(|p| p.query(name, matcher))
    }

    pub fn body(self, pattern: BodyPattern) -> Self {
        self.with_pattern(|p| p.body(pattern))
    }

    pub fn times(mut self, quantifier: Quantifier) -> Self {
        self.quantifier = quantifier;
        self
    }

    pub fn exactly_once(self) -> Self {
        self.times(Quantifier::ExactlyOnce)
    }

    pub fn at_least_once(self) -> Self {
        self.times(Quantifier::AtLeastOnce)
    }

    pub fn exactly(self, count: usize) -> Self {
        self.times(Quantifier::ExactCount(count))
    }

    pub fn never(self) -> Self {
        self.times(Quantifier::ExactCount(0))
    }

    /// Additionally require that nothing else was received.
    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    pub fn target(&self) -> &ExpectationTarget {
        &self.target
    }

    pub fn quantifier(&self) -> Quantifier {
        self.quantifier
    }

    pub fn is_exclusive(&self) -> bool {
        self.exclusive
    }
}

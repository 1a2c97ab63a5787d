//! Verification engine.
//!
//! A pure function of an expectation, a log snapshot and the stub registry
//! used to resolve named-stub expectations. Nothing here touches the log or
//! any I/O, so it can be exercised without a running endpoint.

use super::expectation::{ExpectationDescriptor, ExpectationTarget, Quantifier};
use crate::dispatch::StubRegistry;
use crate::error::{VerificationError, VerificationFailure};
use crate::render::{render_field_table, render_request, render_requests, RenderOptions};
use crate::request_log::CapturedRequest;
use crate::stub::{CompiledRequestMatcher, FieldDiff, RequestMatcher, RequestParts};
use std::fmt;
use tracing::{debug, warn};

/// Outcome of evaluating an expectation against a request log.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationResult {
    pub endpoint: String,
    /// Human-readable expected pattern, one line per field
    pub expected: Vec<String>,
    pub quantifier: Quantifier,
    pub exclusive: bool,
    pub matched: Vec<CapturedRequest>,
    pub all_received: Vec<CapturedRequest>,
    pub satisfied: bool,
    /// Field outcomes for the received request closest to the pattern, when
    /// nothing matched
    pub closest: Option<(u64, Vec<FieldDiff>)>,
}

impl VerificationResult {
    /// Why the expectation failed, or `None` when satisfied.
    pub fn reason(&self) -> Option<String> {
        if self.satisfied {
            return None;
        }
        let count = self.matched.len();
        if !self.quantifier.is_satisfied_by(count) {
            return Some(format!(
                "expected {} matching the pattern but {} {} received",
                self.quantifier,
                count,
                if count == 1 { "was" } else { "were" }
            ));
        }
        let others = self.all_received.len() - count;
        Some(format!(
            "expected no other requests but {} of {} received requests did not match",
            others,
            self.all_received.len()
        ))
    }

    /// Render the full diagnostic report.
    pub fn report(&self, options: &RenderOptions) -> String {
        VerificationReport {
            result: self,
            options,
        }
        .to_string()
    }
}

/// Display adapter for a [`VerificationResult`] report.
pub struct VerificationReport<'a> {
    pub result: &'a VerificationResult,
    pub options: &'a RenderOptions,
}

impl fmt::Display for VerificationReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.result;
        let options = self.options;
        if result.satisfied {
            writeln!(f, "Verification passed on endpoint '{}'", result.endpoint)?;
        } else {
            writeln!(f, "Verification failed on endpoint '{}'", result.endpoint)?;
        }
        if let Some(reason) = result.reason() {
            writeln!(f, "Reason: {reason}")?;
        }
        writeln!(f)?;

        writeln!(f, "Expected {} matching:", result.quantifier)?;
        if result.expected.is_empty() {
            writeln!(f, "  any request")?;
        }
        for line in &result.expected {
            writeln!(f, "  {line}")?;
        }
        if result.exclusive {
            writeln!(f, "and no other requests")?;
        }
        writeln!(f)?;

        writeln!(f, "Matched requests ({}):", result.matched.len())?;
        render_requests(f, &result.matched, options)?;
        writeln!(f)?;

        writeln!(f, "All received requests ({}):", result.all_received.len())?;
        render_requests(f, &result.all_received, options)?;

        if let Some((sequence, fields)) = &result.closest {
            if let Some(request) = result.all_received.iter().find(|r| r.sequence == *sequence) {
                writeln!(f)?;
                writeln!(f, "Closest received request:")?;
                render_request(f, request, options)?;
                writeln!(f)?;
                render_field_table(f, fields, options)?;
            }
        }
        Ok(())
    }
}

/// The compiled matchers an expectation resolves to; all must match.
struct EffectiveMatcher {
    matchers: Vec<CompiledRequestMatcher>,
    description: Vec<String>,
}

impl EffectiveMatcher {
    fn resolve(
        descriptor: &ExpectationDescriptor,
        registry: &StubRegistry,
    ) -> Result<Self, VerificationError> {
        let mut matchers = Vec::new();
        let mut description = Vec::new();
        let refinement = match descriptor.target() {
            ExpectationTarget::Pattern(pattern) => pattern,
            ExpectationTarget::Stub { name, refinement } => {
                let stub = registry
                    .find_by_name(name)
                    .ok_or_else(|| VerificationError::UnknownStub(name.clone()))?;
                description.push(format!("stub {}", stub.label()));
                description.extend(describe(stub.matcher.config()));
                matchers.push(stub.matcher.clone());
                refinement
            }
        };
        if !refinement.is_empty() {
            description.extend(describe(refinement));
            matchers.push(CompiledRequestMatcher::compile(refinement)?);
        }
        Ok(Self {
            matchers,
            description,
        })
    }

    fn is_match(&self, request: &RequestParts<'_>) -> bool {
        self.matchers.iter().all(|m| m.is_match(request))
    }

    fn evaluate(&self, request: &RequestParts<'_>) -> Vec<FieldDiff> {
        self.matchers
            .iter()
            .flat_map(|m| m.evaluate(request).fields)
            .collect()
    }
}

fn describe(matcher: &RequestMatcher) -> Vec<String> {
    matcher
        .describe()
        .into_iter()
        .map(|(field, desc)| format!("{field}: {desc}"))
        .collect()
}

/// Evaluate an expectation without failing on an unsatisfied result.
pub fn evaluate(
    descriptor: &ExpectationDescriptor,
    log: &[CapturedRequest],
    registry: &StubRegistry,
) -> Result<VerificationResult, VerificationError> {
    let effective = EffectiveMatcher::resolve(descriptor, registry)?;

    let matched: Vec<CapturedRequest> = log
        .iter()
        .filter(|r| effective.is_match(&r.parts()))
        .cloned()
        .collect();

    let count_ok = descriptor.quantifier().is_satisfied_by(matched.len());
    let exclusive_ok = !descriptor.is_exclusive() || matched.len() == log.len();
    let satisfied = count_ok && exclusive_ok;

    let closest = if matched.is_empty() && !satisfied {
        closest_request(&effective, log)
    } else {
        None
    };

    debug!(
        "Evaluated expectation on endpoint '{}': {} of {} requests matched",
        registry.endpoint(),
        matched.len(),
        log.len()
    );

    Ok(VerificationResult {
        endpoint: registry.endpoint().to_string(),
        expected: effective.description,
        quantifier: descriptor.quantifier(),
        exclusive: descriptor.is_exclusive(),
        matched,
        all_received: log.to_vec(),
        satisfied,
        closest,
    })
}

/// Evaluate an expectation and fail with the rendered report when unsatisfied.
pub fn verify(
    descriptor: &ExpectationDescriptor,
    log: &[CapturedRequest],
    registry: &StubRegistry,
    options: &RenderOptions,
) -> Result<VerificationResult, VerificationError> {
    let result = evaluate(descriptor, log, registry)?;
    if result.satisfied {
        return Ok(result);
    }
    let report = result.report(options);
    warn!("{}", report);
    Err(VerificationError::Unsatisfied(Box::new(VerificationFailure {
        result,
        report,
    })))
}

fn closest_request(
    effective: &EffectiveMatcher,
    log: &[CapturedRequest],
) -> Option<(u64, Vec<FieldDiff>)> {
    let mut best: Option<(u64, Vec<FieldDiff>, usize)> = None;
    for request in log {
        let fields = effective.evaluate(&request.parts());
        let unmet = fields.iter().filter(|f| !f.matched).count();
        if best.as_ref().map_or(true, |(_, _, b)| unmet < *b) {
            best = Some((request.sequence, fields, unmet));
        }
    }
    best.map(|(sequence, fields, _)| (sequence, fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Method, NormalizedRequest};
    use crate::request_log::{MatchOutcome, RequestLog};
    use crate::stub::{RequestMatcher, ResponseDefinition, StubDefinition};

    fn log_of(requests: Vec<NormalizedRequest>) -> Vec<CapturedRequest> {
        let log = RequestLog::new();
        for r in requests {
            log.append(r, MatchOutcome::Unmatched);
        }
        log.snapshot()
    }

    fn registry() -> StubRegistry {
        StubRegistry::from_definitions(
            "users",
            &[StubDefinition::new(
                RequestMatcher::new().method(Method::Post).path("/users"),
                ResponseDefinition::status(201),
            )
            .named("create-user")],
        )
        .unwrap()
    }

    fn post_users() -> NormalizedRequest {
        NormalizedRequest::new(Method::Post, "/users")
    }

    #[test]
    fn test_exactly_once_fails_with_two_matches() {
        let log = log_of(vec![post_users(), post_users()]);
        let descriptor = ExpectationDescriptor::new()
            .method(Method::Post)
            .path("/users")
            .exactly_once();

        let err = verify(&descriptor, &log, &registry(), &RenderOptions::default()).unwrap_err();
        let result = err.result().unwrap();
        assert_eq!(result.matched.len(), 2);
        assert!(!result.satisfied);
    }

    #[test]
    fn test_exclusive_fails_when_other_request_received() {
        let log = log_of(vec![post_users(), NormalizedRequest::new(Method::Get, "/health")]);
        let descriptor = ExpectationDescriptor::new()
            .method(Method::Post)
            .path("/users")
            .at_least_once()
            .exclusive();

        let err = verify(&descriptor, &log, &registry(), &RenderOptions::default()).unwrap_err();
        let result = err.result().unwrap();
        assert_eq!(result.matched.len(), 1);
        assert_eq!(result.all_received.len(), 2);

        let report = err.to_string();
        assert!(report.contains("Matched requests (1):"));
        assert!(report.contains("All received requests (2):"));
        assert!(report.contains("1 of 2 received requests did not match"));
    }

    #[test]
    fn test_exclusive_passes_when_everything_matches() {
        let log = log_of(vec![post_users(), post_users()]);
        let descriptor = ExpectationDescriptor::new()
            .path("/users")
            .exactly(2)
            .exclusive();
        let result = verify(&descriptor, &log, &registry(), &RenderOptions::default()).unwrap();
        assert!(result.satisfied);
    }

    #[test]
    fn test_never_received() {
        let log = log_of(vec![post_users()]);
        let descriptor = ExpectationDescriptor::new().method(Method::Delete).never();
        assert!(verify(&descriptor, &log, &registry(), &RenderOptions::default()).is_ok());
    }

    #[test]
    fn test_named_stub_expectation() {
        let log = log_of(vec![post_users(), NormalizedRequest::new(Method::Post, "/other")]);
        let result = evaluate(
            &ExpectationDescriptor::for_stub("create-user").exactly_once(),
            &log,
            &registry(),
        )
        .unwrap();
        assert!(result.satisfied);
        assert_eq!(result.expected[0], "stub 'create-user' (#0)");
    }

    #[test]
    fn test_named_stub_refinement_narrows() {
        let log = log_of(vec![post_users().header("x-tenant", "a"), post_users()]);
        let result = evaluate(
            &ExpectationDescriptor::for_stub("create-user")
                .header("x-tenant", "a")
                .exactly_once(),
            &log,
            &registry(),
        )
        .unwrap();
        assert!(result.satisfied);
        assert_eq!(result.matched[0].sequence, 0);
    }

    #[test]
    fn test_unknown_stub() {
        let err = evaluate(&ExpectationDescriptor::for_stub("nope"), &[], &registry()).unwrap_err();
        assert!(matches!(err, VerificationError::UnknownStub(ref n) if n == "nope"));
    }

    #[test]
    fn test_invalid_regex_in_expectation() {
        let err = evaluate(
            &ExpectationDescriptor::new().path(crate::matcher::CompositeMatcher::matching("(")),
            &[],
            &registry(),
        )
        .unwrap_err();
        assert!(matches!(err, VerificationError::InvalidExpectation(_)));
    }

    #[test]
    fn test_closest_request_reported_when_nothing_matched() {
        let log = log_of(vec![
            NormalizedRequest::new(Method::Get, "/health"),
            NormalizedRequest::new(Method::Put, "/users"),
        ]);
        let result = evaluate(
            &ExpectationDescriptor::new().method(Method::Post).path("/users"),
            &log,
            &registry(),
        )
        .unwrap();
        assert!(!result.satisfied);
        let (sequence, fields) = result.closest.clone().unwrap();
        assert_eq!(sequence, 1);
        assert_eq!(fields.iter().filter(|f| !f.matched).count(), 1);
        assert!(result
            .report(&RenderOptions::default())
            .contains("Closest received request:"));
    }

    #[test]
    fn test_report_golden() {
        let log = log_of(vec![
            post_users().body(r#"{"name":"ada"}"#),
            post_users().header("X-Retry", "1").body(r#"{"name":"ada"}"#),
        ]);
        let result = evaluate(
            &ExpectationDescriptor::new()
                .method(Method::Post)
                .path("/users")
                .exactly_once(),
            &log,
            &registry(),
        )
        .unwrap();

        let expected = concat!(
            "Verification failed on endpoint 'users'\n",
            "Reason: expected exactly 1 request matching the pattern but 2 were received\n",
            "\n",
            "Expected exactly 1 request matching:\n",
            "  method: POST\n",
            "  path: equals \"/users\"\n",
            "\n",
            "Matched requests (2):\n",
            "  #0 POST /users\n",
            "      body: {\"name\":\"ada\"}\n",
            "      matched stub: none\n",
            "  #1 POST /users\n",
            "      header x-retry: 1\n",
            "      body: {\"name\":\"ada\"}\n",
            "      matched stub: none\n",
            "\n",
            "All received requests (2):\n",
            "  #0 POST /users\n",
            "      body: {\"name\":\"ada\"}\n",
            "      matched stub: none\n",
            "  #1 POST /users\n",
            "      header x-retry: 1\n",
            "      body: {\"name\":\"ada\"}\n",
            "      matched stub: none\n",
        );
        assert_eq!(result.report(&RenderOptions::default()), expected);
    }
}

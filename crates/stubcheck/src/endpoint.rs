//! Mock endpoint: stub dispatch, request recording and verification for one
//! stubbed dependency.

use crate::config::EndpointConfig;
use crate::dispatch::{render_near_miss, Dispatch, StubRegistry};
use crate::error::{ConfigError, VerificationError};
use crate::request::{Multimap, NormalizedRequest, NormalizedResponse};
use crate::request_log::{CapturedRequest, MatchOutcome, RequestLog};
use crate::stub::StubDefinition;
use crate::verify::{self, ExpectationDescriptor, VerificationResult};
use bytes::Bytes;
use tracing::{debug, info, warn};

/// One stubbed dependency as seen by the service under test.
///
/// Stubs are fixed at construction. `handle` may be called concurrently from
/// any number of listener threads; verification reads a snapshot of the log.
#[derive(Debug)]
pub struct MockEndpoint {
    config: EndpointConfig,
    registry: StubRegistry,
    log: RequestLog,
}

impl MockEndpoint {
    /// Compile and register `stubs`; fails on the first invalid definition.
    pub fn new(config: EndpointConfig, stubs: &[StubDefinition]) -> Result<Self, ConfigError> {
        let registry = StubRegistry::from_definitions(config.name.clone(), stubs)?;
        Ok(Self {
            config,
            registry,
            log: RequestLog::new(),
        })
    }

    /// Endpoint with default configuration.
    pub fn with_stubs(name: impl Into<String>, stubs: &[StubDefinition]) -> Result<Self, ConfigError> {
        Self::new(EndpointConfig::new(name), stubs)
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    pub fn registry(&self) -> &StubRegistry {
        &self.registry
    }

    /// Answer one inbound request.
    ///
    /// Never fails: an unmatched request gets the near-miss diagnostic as a
    /// plain-text body with the configured unmatched status.
    pub fn handle(&self, request: NormalizedRequest) -> NormalizedResponse {
        let (response, outcome) = match self.registry.dispatch(&request.parts()) {
            Dispatch::Matched(stub) => {
                debug!(
                    "Endpoint '{}': {} {} matched stub {}",
                    self.config.name,
                    request.method,
                    request.path,
                    stub.label()
                );
                (
                    stub.response.clone(),
                    MatchOutcome::Matched {
                        index: stub.index,
                        name: stub.name.clone(),
                    },
                )
            }
            Dispatch::Unmatched(near_miss) => {
                let diagnostic = render_near_miss(
                    &self.config.name,
                    &request.parts(),
                    near_miss.as_ref(),
                    &self.config.render_options(),
                );
                if self.config.log_unmatched {
                    warn!("{}", diagnostic);
                }
                (self.unmatched_response(diagnostic), MatchOutcome::Unmatched)
            }
        };

        if self.config.record_requests {
            self.log.append(request, outcome);
        } else {
            self.log.count_unrecorded();
        }
        response
    }

    fn unmatched_response(&self, diagnostic: String) -> NormalizedResponse {
        let mut headers = Multimap::new();
        headers.insert(
            "Content-Type".to_string(),
            vec!["text/plain; charset=utf-8".to_string()],
        );
        NormalizedResponse {
            status_code: self.config.unmatched_status,
            headers,
            body: Bytes::from(diagnostic),
        }
    }

    /// Verify an expectation against everything received so far.
    pub fn verify(
        &self,
        descriptor: &ExpectationDescriptor,
    ) -> Result<VerificationResult, VerificationError> {
        verify::verify(
            descriptor,
            &self.log.snapshot(),
            &self.registry,
            &self.config.render_options(),
        )
    }

    /// Evaluate an expectation without failing when it is unsatisfied.
    pub fn evaluate(
        &self,
        descriptor: &ExpectationDescriptor,
    ) -> Result<VerificationResult, VerificationError> {
        verify::evaluate(descriptor, &self.log.snapshot(), &self.registry)
    }

    /// Snapshot of the request log in arrival order.
    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.log.snapshot()
    }

    pub fn unmatched_requests(&self) -> Vec<CapturedRequest> {
        self.log.unmatched()
    }

    /// Requests handled since the last reset, including unrecorded ones.
    pub fn request_count(&self) -> u64 {
        self.log.received()
    }

    /// Clear the request log and the request count at a test boundary.
    pub fn reset(&self) {
        let cleared = self.log.reset();
        info!(
            "Endpoint '{}' reset, {} recorded requests cleared",
            self.config.name, cleared
        );
    }
}

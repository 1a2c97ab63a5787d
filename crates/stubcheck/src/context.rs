//! Suite context: the endpoints of one test-suite run and the outcome of
//! every verification made through it.
//!
//! Constructed explicitly by the harness and passed to tests, so parallel
//! suite runs never share state.

use crate::endpoint::MockEndpoint;
use crate::error::{ConfigError, VerificationError};
use crate::verify::{ExpectationDescriptor, VerificationResult};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Recorded outcome of one verification call.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationOutcome {
    pub endpoint: String,
    pub passed: bool,
    /// Rendered report; empty for passing verifications
    pub report: String,
}

/// Counts over all verifications made in a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuiteSummary {
    pub outcomes: Vec<VerificationOutcome>,
}

impl SuiteSummary {
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.passed()
    }

    pub fn failures(&self) -> impl Iterator<Item = &VerificationOutcome> {
        self.outcomes.iter().filter(|o| !o.passed)
    }
}

impl fmt::Display for SuiteSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} verifications, {} passed, {} failed",
            self.outcomes.len(),
            self.passed(),
            self.failed()
        )?;
        for (i, outcome) in self.outcomes.iter().enumerate() {
            let status = if outcome.passed { "passed" } else { "FAILED" };
            writeln!(f, "  [{i}] {} {status}", outcome.endpoint)?;
        }
        for outcome in self.failures() {
            writeln!(f)?;
            f.write_str(&outcome.report)?;
        }
        Ok(())
    }
}

/// Endpoints registered for one suite run, keyed by name.
#[derive(Debug, Default)]
pub struct SuiteContext {
    endpoints: RwLock<BTreeMap<String, Arc<MockEndpoint>>>,
    outcomes: Mutex<Vec<VerificationOutcome>>,
}

impl SuiteContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an endpoint under its configured name.
    pub fn register(&self, endpoint: MockEndpoint) -> Result<Arc<MockEndpoint>, ConfigError> {
        let name = endpoint.name().to_string();
        let mut endpoints = self.endpoints.write();
        if endpoints.contains_key(&name) {
            warn!("Endpoint '{}' is already registered in this suite", name);
            return Err(ConfigError::DuplicateEndpoint(name));
        }
        let endpoint = Arc::new(endpoint);
        endpoints.insert(name.clone(), Arc::clone(&endpoint));
        info!("Registered endpoint '{}' in suite context", name);
        Ok(endpoint)
    }

    pub fn endpoint(&self, name: &str) -> Option<Arc<MockEndpoint>> {
        self.endpoints.read().get(name).cloned()
    }

    pub fn endpoint_names(&self) -> Vec<String> {
        self.endpoints.read().keys().cloned().collect()
    }

    /// Clear every endpoint's request log at a test boundary.
    pub fn reset_all(&self) {
        let endpoints = self.endpoints.read();
        for endpoint in endpoints.values() {
            endpoint.reset();
        }
        debug!("Reset {} endpoints", endpoints.len());
    }

    /// Verify against the named endpoint and record the outcome.
    ///
    /// Expectations that cannot be evaluated at all (unknown endpoint or
    /// stub, invalid matcher) are recorded as failures too.
    pub fn verify(
        &self,
        endpoint: &str,
        descriptor: &ExpectationDescriptor,
    ) -> Result<VerificationResult, VerificationError> {
        let result = match self.endpoint(endpoint) {
            Some(target) => target.verify(descriptor),
            None => Err(VerificationError::UnknownEndpoint(endpoint.to_string())),
        };
        let outcome = VerificationOutcome {
            endpoint: endpoint.to_string(),
            passed: result.is_ok(),
            report: match &result {
                Ok(_) => String::new(),
                Err(e) => e.to_string(),
            },
        };
        self.outcomes.lock().push(outcome);
        result
    }

    /// Every verification outcome recorded so far, in call order.
    pub fn summary(&self) -> SuiteSummary {
        SuiteSummary {
            outcomes: self.outcomes.lock().clone(),
        }
    }
}

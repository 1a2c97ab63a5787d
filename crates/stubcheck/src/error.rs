//! Error types for endpoint setup, verification and the HTTP boundary.
//!
//! Errors never cross the request path: a request that matches no stub, or
//! whose body cannot be parsed for a JSON pattern, is answered with a normal
//! response. Only setup and verification surface errors to test code.

use crate::verify::VerificationResult;
use thiserror::Error;

/// Configuration errors detected eagerly while registering stubs or endpoints.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Duplicate stub name '{name}' on endpoint '{endpoint}'")]
    DuplicateStubName { endpoint: String, name: String },

    #[error("Invalid regex for {field}: '{pattern}': {source}")]
    InvalidRegex {
        field: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid base64 response body in stub {stub}: {source}")]
    InvalidBase64 {
        stub: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("Invalid JSON path '{0}'")]
    InvalidJsonPath(String),

    #[error("Invalid stub definition: {0}")]
    InvalidDefinition(#[from] serde_json::Error),

    #[error("Endpoint '{0}' is already registered")]
    DuplicateEndpoint(String),
}

/// A verification that could not be satisfied, with everything needed to
/// render the diagnostic without querying the log again.
#[derive(Debug, Clone)]
pub struct VerificationFailure {
    pub result: VerificationResult,
    pub report: String,
}

/// Errors returned from verification calls.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("{}", .0.report)]
    Unsatisfied(Box<VerificationFailure>),

    #[error("No stub named '{0}' is registered on this endpoint")]
    UnknownStub(String),

    #[error("Invalid expectation: {0}")]
    InvalidExpectation(#[from] ConfigError),

    #[error("No endpoint named '{0}' is registered in this suite")]
    UnknownEndpoint(String),
}

impl VerificationError {
    /// The failed result, when the error is an unsatisfied expectation.
    pub fn result(&self) -> Option<&VerificationResult> {
        match self {
            VerificationError::Unsatisfied(failure) => Some(&failure.result),
            _ => None,
        }
    }
}

/// Errors converting between hyper types and normalized values.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    #[error("Failed to build HTTP response: {0}")]
    Response(#[from] hyper::http::Error),
}

//! Stub matching and request verification for end-to-end tests that stub out
//! third-party HTTP dependencies.
//!
//! A [`MockEndpoint`] answers normalized requests from registered stubs
//! (first match wins, near-miss diagnostic otherwise), records everything it
//! receives, and verifies [`ExpectationDescriptor`]s against that record.

// ===== Matching =====
pub mod matcher;
pub mod stub;

// ===== Dispatch, recording and verification =====
pub mod dispatch;
pub mod request_log;
pub mod verify;

// ===== Endpoint facade and suite context =====
pub mod config;
pub mod context;
pub mod endpoint;
pub mod error;
pub mod render;
pub mod request;

// hyper conversions for NormalizedRequest/NormalizedResponse
mod http;

pub use config::EndpointConfig;
pub use context::{SuiteContext, SuiteSummary, VerificationOutcome};
pub use endpoint::MockEndpoint;
pub use error::{AdapterError, ConfigError, VerificationError, VerificationFailure};
pub use matcher::{CompositeMatcher, StringMatcher};
pub use request::{Method, NormalizedRequest, NormalizedResponse};
pub use request_log::CapturedRequest;
pub use stub::{BodyPattern, RequestMatcher, ResponseBody, ResponseDefinition, StubDefinition};
pub use verify::{ExpectationDescriptor, Quantifier, VerificationResult};

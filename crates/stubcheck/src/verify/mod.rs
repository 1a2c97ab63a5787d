//! Verification of received requests against test expectations.
//!
//! - `expectation` - expectation descriptors and quantifiers
//! - `engine` - evaluation over a log snapshot and the report

mod engine;
mod expectation;

pub use engine::{evaluate, verify, VerificationReport, VerificationResult};
pub use expectation::{ExpectationDescriptor, ExpectationTarget, Quantifier};

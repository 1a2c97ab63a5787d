//! Stub definitions and the field matcher set.
//!
//! - `request_matcher` - method/path/header/query/body matchers combined
//! - `body` - text and JSON-aware body patterns
//! - `response` - canned responses
//! - `definition` - stub definitions and compiled stubs

mod body;
mod definition;
mod request_matcher;
mod response;

pub use body::{BodyPattern, BodyView, CompiledBodyPattern, Segment};
pub use definition::{CompiledStub, StubDefinition};
pub use request_matcher::{
    CompiledRequestMatcher, Field, FieldDiff, MatchEvaluation, RequestMatcher, RequestParts,
};
pub use response::{ResponseBody, ResponseDefinition};

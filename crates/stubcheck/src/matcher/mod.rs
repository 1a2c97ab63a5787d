//! Matcher primitives: leaf string predicates and their AND/OR algebra.
//!
//! Each matcher has a serializable configuration form and a compiled form.
//! Compilation happens once at registration time, which is where invalid
//! regexes are reported.
//!
//! - `cached` - comparison values with pre-computed lowercase
//! - `string_matcher` - equals/contains/matches and their negations
//! - `composite` - AND/OR trees over string matchers

mod cached;
mod composite;
mod string_matcher;

pub use cached::CachedValue;
pub use composite::{CompiledCompositeMatcher, CompositeMatcher};
pub use string_matcher::{CompiledStringMatcher, StringMatcher};

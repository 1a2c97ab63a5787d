//! Stub registry and request dispatch.
//!
//! Dispatch is first-match-wins in registration order. Only when no stub
//! matches is every stub fully evaluated to find the nearest miss, which
//! becomes the diagnostic response.

mod near_miss;
mod registry;

pub use near_miss::{render_near_miss, NearMiss, NearMissReport};
pub use registry::{Dispatch, StubRegistry};

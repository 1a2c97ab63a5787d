//! Near-miss diagnostics for requests that matched no stub.

use crate::render::{render_field_table, render_request_details, RenderOptions};
use crate::stub::{CompiledStub, MatchEvaluation, RequestParts};
use std::fmt;

/// The stub that came closest to matching a request.
#[derive(Debug, Clone)]
pub struct NearMiss<'a> {
    pub stub: &'a CompiledStub,
    pub evaluation: MatchEvaluation,
}

/// Diagnostic served and logged for an unmatched request.
pub struct NearMissReport<'r, 'a> {
    pub endpoint: &'r str,
    pub request: &'r RequestParts<'a>,
    pub near_miss: Option<&'r NearMiss<'a>>,
    pub options: &'r RenderOptions,
}

impl fmt::Display for NearMissReport<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Request was not matched by any stub on endpoint '{}'",
            self.endpoint
        )?;
        writeln!(f)?;
        writeln!(f, "Request:")?;
        writeln!(f, "  {} {}", self.request.method, self.request.path)?;
        render_request_details(f, self.request, self.options)?;
        writeln!(f)?;

        match self.near_miss {
            None => writeln!(f, "No stubs are registered on this endpoint."),
            Some(near) => {
                writeln!(
                    f,
                    "Closest stub: {}, {} of {} fields unmet",
                    near.stub.label(),
                    near.evaluation.unmet_count(),
                    near.evaluation.fields.len()
                )?;
                writeln!(f)?;
                render_field_table(f, &near.evaluation.fields, self.options)
            }
        }
    }
}

/// Render the diagnostic served and logged for an unmatched request.
pub fn render_near_miss(
    endpoint: &str,
    request: &RequestParts<'_>,
    near_miss: Option<&NearMiss<'_>>,
    options: &RenderOptions,
) -> String {
    NearMissReport {
        endpoint,
        request,
        near_miss,
        options,
    }
    .to_string()
}

//! Mock endpoint configuration.

use crate::render::RenderOptions;
use serde::{Deserialize, Serialize};

/// Configuration for one mock endpoint.
///
/// Usually handed over already parsed by the test harness; every field except
/// `name` has a default.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EndpointConfig {
    /// Endpoint name, used in logs and reports
    pub name: String,

    /// Status code of the near-miss response for unmatched requests
    #[serde(default = "default_unmatched_status")]
    pub unmatched_status: u16,

    /// Whether inbound requests are appended to the request log
    #[serde(default = "default_true")]
    pub record_requests: bool,

    /// Maximum body characters shown in diagnostics
    #[serde(default = "default_max_body_preview")]
    pub max_body_preview: usize,

    /// Emit a warning with the near-miss diagnostic for unmatched requests
    #[serde(default = "default_true")]
    pub log_unmatched: bool,

    /// Show arrival timestamps in verification reports
    #[serde(default)]
    pub include_timestamps: bool,
}

fn default_unmatched_status() -> u16 {
    404
}

fn default_true() -> bool {
    true
}

fn default_max_body_preview() -> usize {
    1000
}

impl EndpointConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unmatched_status: default_unmatched_status(),
            record_requests: true,
            max_body_preview: default_max_body_preview(),
            log_unmatched: true,
            include_timestamps: false,
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            max_body_preview: self.max_body_preview,
            include_timestamps: self.include_timestamps,
        }
    }
}

//! Append-only chronological record of the requests an endpoint received.

use crate::request::{Method, Multimap, NormalizedRequest};
use crate::stub::RequestParts;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::debug;

/// A request as received by an endpoint, with its dispatch outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedRequest {
    /// Position in arrival order; authoritative for ordering
    pub sequence: u64,
    /// Wall-clock arrival time, for display only
    pub timestamp: DateTime<Utc>,
    pub request: NormalizedRequest,
    pub matched_stub_index: Option<usize>,
    pub matched_stub_name: Option<String>,
}

impl CapturedRequest {
    pub fn method(&self) -> Method {
        self.request.method
    }

    pub fn path(&self) -> &str {
        &self.request.path
    }

    pub fn headers(&self) -> &Multimap {
        &self.request.headers
    }

    pub fn query_parameters(&self) -> &Multimap {
        &self.request.query_parameters
    }

    pub fn body(&self) -> &[u8] {
        &self.request.body
    }

    pub fn was_matched(&self) -> bool {
        self.matched_stub_index.is_some()
    }

    pub fn parts(&self) -> RequestParts<'_> {
        self.request.parts()
    }
}

/// Which stub, if any, served a request.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Matched { index: usize, name: Option<String> },
    Unmatched,
}

#[derive(Debug, Default)]
struct LogState {
    next_sequence: u64,
    /// Requests handled since the last reset, recorded or not
    received: u64,
    entries: Vec<CapturedRequest>,
}

/// Thread-safe request log scoped to one endpoint.
///
/// Sequence numbers and timestamps are assigned under the same lock as the
/// append, so entries come back in exactly the order they were accepted.
#[derive(Debug, Default)]
pub struct RequestLog {
    state: Mutex<LogState>,
}

impl RequestLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request and return its sequence number.
    pub fn append(&self, request: NormalizedRequest, outcome: MatchOutcome) -> u64 {
        let (matched_stub_index, matched_stub_name) = match outcome {
            MatchOutcome::Matched { index, name } => (Some(index), name),
            MatchOutcome::Unmatched => (None, None),
        };

        let mut state = self.state.lock();
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.received += 1;
        state.entries.push(CapturedRequest {
            sequence,
            timestamp: Utc::now(),
            request,
            matched_stub_index,
            matched_stub_name,
        });
        sequence
    }

    /// Count a handled request without recording it.
    pub fn count_unrecorded(&self) {
        self.state.lock().received += 1;
    }

    /// Requests handled since the last reset, including unrecorded ones.
    pub fn received(&self) -> u64 {
        self.state.lock().received
    }

    /// Copy of all entries in arrival order.
    pub fn snapshot(&self) -> Vec<CapturedRequest> {
        self.state.lock().entries.clone()
    }

    /// Entries that no stub matched.
    pub fn unmatched(&self) -> Vec<CapturedRequest> {
        self.state
            .lock()
            .entries
            .iter()
            .filter(|r| !r.was_matched())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all entries and the received count, returning how many entries
    /// were dropped.
    ///
    /// Sequence numbers keep increasing across resets.
    pub fn reset(&self) -> usize {
        let cleared = {
            let mut state = self.state.lock();
            state.received = 0;
            std::mem::take(&mut state.entries)
        };
        debug!("Request log reset, {} entries cleared", cleared.len());
        cleared.len()
    }
}

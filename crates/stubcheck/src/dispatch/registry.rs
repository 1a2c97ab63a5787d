//! Ordered stub registry with first-match-wins dispatch.

use super::near_miss::NearMiss;
use crate::error::ConfigError;
use crate::stub::{CompiledStub, RequestParts, StubDefinition};
use std::collections::HashSet;
use tracing::info;

/// Outcome of dispatching one request.
#[derive(Debug)]
pub enum Dispatch<'a> {
    Matched(&'a CompiledStub),
    /// No stub matched; carries the nearest miss when any stub exists
    Unmatched(Option<NearMiss<'a>>),
}

/// Stubs of one endpoint, kept in registration order.
#[derive(Debug, Clone, Default)]
pub struct StubRegistry {
    endpoint: String,
    stubs: Vec<CompiledStub>,
}

impl StubRegistry {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            stubs: Vec::new(),
        }
    }

    /// Compile and register a set of definitions, failing on the first
    /// invalid one. Nothing is registered on failure.
    pub fn from_definitions(
        endpoint: impl Into<String>,
        definitions: &[StubDefinition],
    ) -> Result<Self, ConfigError> {
        let mut registry = Self::new(endpoint);
        let mut names = HashSet::new();
        for definition in definitions {
            if let Some(name) = &definition.name {
                if !names.insert(name.as_str()) {
                    return Err(ConfigError::DuplicateStubName {
                        endpoint: registry.endpoint.clone(),
                        name: name.clone(),
                    });
                }
            }
            let index = registry.stubs.len();
            registry.stubs.push(CompiledStub::compile(index, definition)?);
        }
        info!(
            "Registered {} stubs on endpoint '{}'",
            registry.stubs.len(),
            registry.endpoint
        );
        Ok(registry)
    }

    /// Register one more stub after the existing ones, returning its index.
    pub fn register(&mut self, definition: &StubDefinition) -> Result<usize, ConfigError> {
        if let Some(name) = &definition.name {
            if self.find_by_name(name).is_some() {
                return Err(ConfigError::DuplicateStubName {
                    endpoint: self.endpoint.clone(),
                    name: name.clone(),
                });
            }
        }
        let index = self.stubs.len();
        self.stubs.push(CompiledStub::compile(index, definition)?);
        Ok(index)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn stubs(&self) -> &[CompiledStub] {
        &self.stubs
    }

    pub fn len(&self) -> usize {
        self.stubs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stubs.is_empty()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&CompiledStub> {
        self.stubs.iter().find(|s| s.name.as_deref() == Some(name))
    }

    /// First stub, in registration order, that fully matches.
    pub fn find_match(&self, request: &RequestParts<'_>) -> Option<&CompiledStub> {
        self.stubs.iter().find(|s| s.matcher.is_match(request))
    }

    /// Stub with the fewest unmet fields; ties go to the earlier stub.
    pub fn nearest_miss(&self, request: &RequestParts<'_>) -> Option<NearMiss<'_>> {
        let mut best: Option<NearMiss<'_>> = None;
        for stub in &self.stubs {
            let evaluation = stub.matcher.evaluate(request);
            let better = best
                .as_ref()
                .map_or(true, |b| evaluation.unmet_count() < b.evaluation.unmet_count());
            if better {
                best = Some(NearMiss { stub, evaluation });
            }
        }
        best
    }

    pub fn dispatch(&self, request: &RequestParts<'_>) -> Dispatch<'_> {
        match self.find_match(request) {
            Some(stub) => Dispatch::Matched(stub),
            None => Dispatch::Unmatched(self.nearest_miss(request)),
        }
    }
}

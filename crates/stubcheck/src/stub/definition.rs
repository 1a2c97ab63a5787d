//! Stub definitions and their compiled form.

use super::request_matcher::{CompiledRequestMatcher, RequestMatcher};
use super::response::ResponseDefinition;
use crate::error::ConfigError;
use crate::request::NormalizedResponse;
use serde::{Deserialize, Serialize};

/// A declarative rule pairing a request matcher with a canned response.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StubDefinition {
    /// Optional name, unique within one endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, alias = "requestMatcher")]
    pub request: RequestMatcher,

    #[serde(default)]
    pub response: ResponseDefinition,
}

impl StubDefinition {
    pub fn new(request: RequestMatcher, response: ResponseDefinition) -> Self {
        Self {
            name: None,
            request,
            response,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Build from an already-parsed JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        Ok(serde_json::from_value(value)?)
    }
}

/// A registered stub, ready for dispatch.
#[derive(Debug, Clone)]
pub struct CompiledStub {
    /// Registration position
    pub index: usize,
    pub name: Option<String>,
    pub matcher: CompiledRequestMatcher,
    pub response: NormalizedResponse,
}

impl CompiledStub {
    pub fn compile(index: usize, definition: &StubDefinition) -> Result<Self, ConfigError> {
        let label = stub_label(index, definition.name.as_deref());
        Ok(Self {
            index,
            name: definition.name.clone(),
            matcher: CompiledRequestMatcher::compile(&definition.request)?,
            response: definition.response.render(&label)?,
        })
    }

    /// `'name' (#index)` or `#index` for unnamed stubs.
    pub fn label(&self) -> String {
        stub_label(self.index, self.name.as_deref())
    }
}

fn stub_label(index: usize, name: Option<&str>) -> String {
    match name {
        Some(name) => format!("'{name}' (#{index})"),
        None => format!("#{index}"),
    }
}

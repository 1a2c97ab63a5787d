//! Canned responses.

use crate::error::ConfigError;
use crate::request::{Multimap, NormalizedResponse};
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response body: exactly one of literal text, structured JSON or base64 binary.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ResponseBody {
    Text(String),
    Json(Value),
    Base64(String),
}

impl ResponseBody {
    pub fn text(text: impl Into<String>) -> Self {
        ResponseBody::Text(text.into())
    }

    pub fn json(value: Value) -> Self {
        ResponseBody::Json(value)
    }

    pub fn base64(encoded: impl Into<String>) -> Self {
        ResponseBody::Base64(encoded.into())
    }

    /// Encode arbitrary bytes as a base64 body.
    pub fn binary(bytes: &[u8]) -> Self {
        ResponseBody::Base64(base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    fn default_content_type(&self) -> Option<&'static str> {
        match self {
            ResponseBody::Text(_) => None,
            ResponseBody::Json(_) => Some("application/json"),
            ResponseBody::Base64(_) => Some("application/octet-stream"),
        }
    }
}

/// Response configuration for a stub.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDefinition {
    #[serde(default = "default_status_code")]
    pub status_code: u16,

    #[serde(default, skip_serializing_if = "Multimap::is_empty")]
    pub headers: Multimap,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<ResponseBody>,
}

fn default_status_code() -> u16 {
    200
}

impl Default for ResponseDefinition {
    fn default() -> Self {
        Self {
            status_code: default_status_code(),
            headers: Multimap::new(),
            body: None,
        }
    }
}

impl ResponseDefinition {
    pub fn status(status_code: u16) -> Self {
        Self {
            status_code,
            ..Self::default()
        }
    }

    pub fn ok() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.entry(name.into()).or_default().push(value.into());
        self
    }

    pub fn body(mut self, body: ResponseBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Render into the response served on every match.
    ///
    /// Base64 bodies are decoded here so a malformed body fails registration
    /// instead of a request.
    pub fn render(&self, stub: &str) -> Result<NormalizedResponse, ConfigError> {
        let body = match &self.body {
            None => Bytes::new(),
            Some(ResponseBody::Text(text)) => Bytes::from(text.clone()),
            Some(ResponseBody::Json(value)) => Bytes::from(value.to_string()),
            Some(ResponseBody::Base64(encoded)) => {
                let decoded = base64::engine::general_purpose::STANDARD
                    .decode(encoded.trim())
                    .map_err(|source| ConfigError::InvalidBase64 {
                        stub: stub.to_string(),
                        source,
                    })?;
                Bytes::from(decoded)
            }
        };

        let mut headers = self.headers.clone();
        let has_content_type = headers
            .keys()
            .any(|k| k.eq_ignore_ascii_case("content-type"));
        if let Some(content_type) = self.body.as_ref().and_then(|b| b.default_content_type()) {
            if !has_content_type {
                headers.insert("Content-Type".to_string(), vec![content_type.to_string()]);
            }
        }

        Ok(NormalizedResponse {
            status_code: self.status_code,
            headers,
            body,
        })
    }
}

//! Classified protocol-level failure.

use reqwest::StatusCode;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::exchange::message::value_to_string;
use crate::producer::ResponseEnvelope;

/// A non-2xx response surfaced as an error.
#[derive(Debug, Clone, Error)]
#[error("HTTP operation failed invoking {uri} with status code {status_code} ({status_text})")]
pub struct OperationFailure {
    uri: String,
    status_code: u16,
    status_text: String,
    redirect_location: Option<String>,
    response_headers: BTreeMap<String, String>,
    response_body: Option<String>,
}

impl OperationFailure {
    pub fn new(uri: impl Into<String>, status_code: u16) -> Self {
        Self {
            uri: uri.into(),
            status_code,
            status_text: status_text(status_code),
            redirect_location: None,
            response_headers: BTreeMap::new(),
            response_body: None,
        }
    }

    /// Build a failure from a received response.
    ///
    /// Multi-valued headers keep their first value. The redirect location is
    /// only recorded for 3xx responses.
    pub fn from_envelope(uri: impl Into<String>, envelope: &ResponseEnvelope) -> Self {
        let status_code = envelope.status().as_u16();
        let response_headers: BTreeMap<String, String> = envelope
            .headers()
            .iter()
            .filter_map(|(name, value)| first_value(value).map(|v| (name.to_string(), v)))
            .collect();

        let redirect_location = if (300..400).contains(&status_code) {
            response_headers
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case("location"))
                .map(|(_, v)| v.clone())
        } else {
            None
        };

        let response_body = if envelope.body().is_empty() {
            None
        } else {
            Some(envelope.text_lossy())
        };

        Self {
            uri: uri.into(),
            status_code,
            status_text: status_text(status_code),
            redirect_location,
            response_headers,
            response_body,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn redirect_location(&self) -> Option<&str> {
        self.redirect_location.as_deref()
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status_code)
    }

    pub fn response_headers(&self) -> &BTreeMap<String, String> {
        &self.response_headers
    }

    pub fn response_body(&self) -> Option<&str> {
        self.response_body.as_deref()
    }
}

fn first_value(value: &Value) -> Option<String> {
    match value {
        Value::Array(values) => values.first().and_then(value_to_string),
        other => value_to_string(other),
    }
}

/// Reason phrase for a status code, or its family name when the code has no
/// canonical reason.
pub fn status_text(code: u16) -> String {
    StatusCode::from_u16(code)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map(str::to_string)
        .unwrap_or_else(|| family_name(code).to_string())
}

/// Name of the status family a code belongs to.
pub fn family_name(code: u16) -> &'static str {
    match code / 100 {
        1 => "INFORMATIONAL",
        2 => "SUCCESSFUL",
        3 => "REDIRECTION",
        4 => "CLIENT_ERROR",
        5 => "SERVER_ERROR",
        _ => "OTHER",
    }
}

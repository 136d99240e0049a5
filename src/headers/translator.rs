//! Message ↔ wire header translation.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Arc;

use crate::config::HeaderFilterConfig;
use crate::exchange::Headers;
use crate::failure::operation::status_text;
use crate::headers::filter::{DefaultHeaderFilter, Direction, HeaderFilterStrategy};
use crate::headers::names;

/// Applies a filter strategy while converting headers in both directions.
#[derive(Debug, Clone)]
pub struct HeaderTranslator {
    filter: Arc<dyn HeaderFilterStrategy>,
    default_charset: String,
}

impl HeaderTranslator {
    pub fn new(filter: Arc<dyn HeaderFilterStrategy>, default_charset: impl Into<String>) -> Self {
        Self {
            filter,
            default_charset: default_charset.into(),
        }
    }

    pub fn from_config(config: &HeaderFilterConfig, default_charset: &str) -> Self {
        Self::new(Arc::new(DefaultHeaderFilter::from_config(config)), default_charset)
    }

    pub fn default_charset(&self) -> &str {
        &self.default_charset
    }

    pub fn filter(&self) -> &Arc<dyn HeaderFilterStrategy> {
        &self.filter
    }

    /// Convert message headers into wire request headers.
    pub fn to_request_headers(&self, headers: &Headers) -> HeaderMap {
        let mut wire = HeaderMap::new();
        for (name, value) in headers.iter() {
            if self.filter.should_block(name, Direction::Outbound) {
                continue;
            }
            let Ok(header_name) = HeaderName::from_bytes(name.as_bytes()) else {
                tracing::debug!(header = %name, "Skipping header with invalid name");
                continue;
            };
            for rendered in render_values(value) {
                match HeaderValue::from_str(&rendered) {
                    Ok(v) => {
                        wire.append(header_name.clone(), v);
                    }
                    Err(_) => {
                        tracing::debug!(header = %name, "Skipping header with invalid value");
                    }
                }
            }
        }
        wire
    }

    /// Convert wire response headers into message headers.
    ///
    /// Repeated headers become arrays. Values that are not visible ASCII are
    /// dropped.
    pub fn from_response_headers(&self, wire: &HeaderMap) -> Headers {
        let mut headers = Headers::new();
        for name in wire.keys() {
            if self.filter.should_block(name.as_str(), Direction::Inbound) {
                continue;
            }
            let values: Vec<Value> = wire
                .get_all(name)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .map(|v| Value::String(v.to_string()))
                .collect();
            let value = match values.len() {
                0 => continue,
                1 => values.into_iter().next().unwrap_or(Value::Null),
                _ => Value::Array(values),
            };
            headers.insert(canonical_name(name.as_str()), value);
        }
        headers
    }

    /// Effective charset of a response: the declared one, or the default.
    pub fn response_charset(&self, wire: &HeaderMap) -> String {
        wire.get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(charset_from_content_type)
            .unwrap_or_else(|| self.default_charset.clone())
    }
}

/// Set the synthesized status headers on an outbound message.
pub fn set_status_headers(headers: &mut Headers, status: StatusCode) {
    headers.insert(names::HTTP_RESPONSE_CODE, status.as_u16());
    headers.insert(names::HTTP_RESPONSE_TEXT, status_text(status.as_u16()));
}

/// Extract the `charset` parameter from a content type.
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            let value = value.trim().trim_matches('"');
            (!value.is_empty()).then(|| value.to_string())
        } else {
            None
        }
    })
}

fn render_values(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().flat_map(render_values).collect(),
        other => vec![other.to_string()],
    }
}

/// `content-type` → `Content-Type`.
fn canonical_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

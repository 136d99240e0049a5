//! Generic response representation and body coercion.

use bytes::Bytes;
use encoding_rs::Encoding;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::exchange::{Body, Headers};
use crate::failure::operation::status_text;
use crate::failure::{ProducerError, ProducerResult};
use crate::headers::names;

/// Status, filtered headers and raw body of a received response.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    status: StatusCode,
    reason: String,
    headers: Headers,
    body: Bytes,
    charset: String,
}

impl ResponseEnvelope {
    pub fn new(status: StatusCode, headers: Headers, body: Bytes, charset: impl Into<String>) -> Self {
        Self {
            status,
            reason: status_text(status.as_u16()),
            headers,
            body,
            charset: charset.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Canonical reason phrase, or the status family name for unknown codes.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.headers.get_string(name)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn charset(&self) -> &str {
        &self.charset
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decode the body using the effective charset.
    pub fn text(&self) -> ProducerResult<String> {
        decode(&self.body, &self.charset)
    }

    /// Decode the body, replacing anything undecodable.
    pub fn text_lossy(&self) -> String {
        decode(&self.body, &self.charset)
            .unwrap_or_else(|_| String::from_utf8_lossy(&self.body).into_owned())
    }

    /// Parse the body as JSON.
    pub fn json(&self) -> ProducerResult<Value> {
        serde_json::from_str(&self.text()?).map_err(|e| {
            ProducerError::ResponseProcessing(format!("response body is not valid JSON: {}", e))
        })
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }
}

fn lookup_charset(name: &str) -> Option<&'static Encoding> {
    Encoding::for_label(name.trim().as_bytes())
}

/// Whether bodies in this charset can be decoded.
pub fn is_supported_charset(name: &str) -> bool {
    lookup_charset(name).is_some()
}

fn decode(body: &[u8], charset: &str) -> ProducerResult<String> {
    let Some(encoding) = lookup_charset(charset) else {
        tracing::warn!(charset = %charset, "Unsupported response charset, decoding as UTF-8");
        return Ok(String::from_utf8_lossy(body).into_owned());
    };
    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .map(|text| text.into_owned())
        .ok_or_else(|| {
            ProducerError::ResponseProcessing(format!(
                "response body is not valid {}",
                encoding.name()
            ))
        })
}

/// Element type of a collection response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    String,
    #[default]
    Json,
}

impl ElementType {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "string" | "text" => Some(ElementType::String),
            "json" | "object" => Some(ElementType::Json),
            _ => None,
        }
    }
}

/// The representation a caller asks the response body to be delivered as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// The whole [`ResponseEnvelope`].
    #[default]
    Response,
    String,
    Bytes,
    Json,
    Collection(ElementType),
    /// Discard the body.
    Void,
}

impl ResponseType {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "response" => Some(ResponseType::Response),
            "string" | "text" => Some(ResponseType::String),
            "bytes" => Some(ResponseType::Bytes),
            "json" => Some(ResponseType::Json),
            "void" => Some(ResponseType::Void),
            _ => None,
        }
    }

    /// Resolve the requested type from the response-class and generic-type
    /// headers, falling back to `default` when neither is set.
    pub fn from_headers(headers: &Headers, default: ResponseType) -> ProducerResult<Self> {
        let class = headers.get_string(names::RESPONSE_CLASS);
        let generic = match headers.get_string(names::RESPONSE_GENERIC_TYPE) {
            Some(g) => Some(ElementType::parse(&g).ok_or_else(|| {
                ProducerError::invalid_header(
                    names::RESPONSE_GENERIC_TYPE,
                    format!("unknown element type '{}'", g),
                )
            })?),
            None => None,
        };

        match (class, generic) {
            (Some(class), generic) if class.trim().eq_ignore_ascii_case("collection") => {
                let element = generic.ok_or_else(|| {
                    ProducerError::invalid_header(
                        names::RESPONSE_GENERIC_TYPE,
                        "a collection response requires an element type",
                    )
                })?;
                Ok(ResponseType::Collection(element))
            }
            (Some(class), _) => ResponseType::parse(&class).ok_or_else(|| {
                ProducerError::invalid_header(
                    names::RESPONSE_CLASS,
                    format!("unknown response type '{}'", class),
                )
            }),
            (None, Some(element)) => Ok(ResponseType::Collection(element)),
            (None, None) => Ok(default),
        }
    }
}

/// Convert an envelope into the requested body representation.
pub fn coerce(envelope: ResponseEnvelope, response_type: ResponseType) -> ProducerResult<Body> {
    match response_type {
        ResponseType::Response => Ok(Body::Response(envelope)),
        ResponseType::Void => Ok(Body::Empty),
        ResponseType::Bytes => Ok(Body::Bytes(envelope.into_body())),
        ResponseType::String => envelope.text().map(Body::Text),
        ResponseType::Json => {
            if envelope.body().is_empty() {
                return Ok(Body::Empty);
            }
            envelope.json().map(Body::Json)
        }
        ResponseType::Collection(element) => {
            if envelope.body().is_empty() {
                return Ok(Body::Json(Value::Array(Vec::new())));
            }
            let Value::Array(items) = envelope.json()? else {
                return Err(ProducerError::ResponseProcessing(
                    "expected a JSON array for a collection response".to_string(),
                ));
            };
            let items = match element {
                ElementType::Json => items,
                ElementType::String => items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(s) => Value::String(s),
                        other => Value::String(other.to_string()),
                    })
                    .collect(),
            };
            Ok(Body::Json(Value::Array(items)))
        }
    }
}

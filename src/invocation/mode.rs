//! Per-call invocation mode selection.

use reqwest::Method;
use serde_json::Value;

use crate::exchange::message::value_to_string;
use crate::exchange::{Body, Headers, Message};
use crate::failure::{ProducerError, ProducerResult};
use crate::headers::names;
use crate::headers::QueryPlan;
use crate::producer::ResponseType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationMode {
    /// Named operation with positional parameters.
    Proxy,
    /// Explicit method, path and query.
    Http,
}

impl InvocationMode {
    /// Read the mode flag, falling back to the endpoint default.
    pub fn select(headers: &Headers, default_http: bool) -> ProducerResult<Self> {
        let use_http = match headers.get(names::USING_HTTP_API) {
            None | Some(Value::Null) => default_http,
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(s)) => parse_flag(s).ok_or_else(|| {
                ProducerError::invalid_header(names::USING_HTTP_API, format!("expected a boolean but was '{}'", s))
            })?,
            Some(other) => {
                return Err(ProducerError::invalid_header(
                    names::USING_HTTP_API,
                    format!("expected a boolean but was {}", other),
                ))
            }
        };
        Ok(if use_http {
            InvocationMode::Http
        } else {
            InvocationMode::Proxy
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InvocationMode::Proxy => "proxy",
            InvocationMode::Http => "http",
        }
    }
}

/// Parse a boolean carried as a string header value.
pub(crate) fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// A call resolved from the inbound message, once per invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    Proxy {
        operation: String,
        params: Vec<Value>,
        /// Values for placeholders in the resource path.
        class_values: Vec<String>,
    },
    Http {
        method: Method,
        path: Option<String>,
        query: QueryPlan,
        substitutions: Vec<String>,
        response_type: ResponseType,
    },
}

impl Invocation {
    pub fn resolve(message: &Message, default_http: bool) -> ProducerResult<Self> {
        let headers = &message.headers;
        match InvocationMode::select(headers, default_http)? {
            InvocationMode::Proxy => {
                let operation = headers
                    .get_string(names::OPERATION_NAME)
                    .filter(|op| !op.trim().is_empty())
                    .ok_or(ProducerError::MissingOperationName(names::OPERATION_NAME))?;
                Ok(Invocation::Proxy {
                    operation,
                    params: positional_params(&message.body),
                    class_values: var_values(headers)?,
                })
            }
            InvocationMode::Http => {
                let method = headers
                    .get_string(names::HTTP_METHOD)
                    .filter(|m| !m.trim().is_empty())
                    .ok_or(ProducerError::MissingHttpMethod(names::HTTP_METHOD))?;
                Ok(Invocation::Http {
                    method: parse_method(&method)?,
                    path: headers.get_string(names::HTTP_PATH),
                    query: QueryPlan::from_headers(headers)?,
                    substitutions: var_values(headers)?,
                    response_type: ResponseType::from_headers(headers, ResponseType::Response)?,
                })
            }
        }
    }

    pub fn mode(&self) -> InvocationMode {
        match self {
            Invocation::Proxy { .. } => InvocationMode::Proxy,
            Invocation::Http { .. } => InvocationMode::Http,
        }
    }
}

pub(crate) fn parse_method(method: &str) -> ProducerResult<Method> {
    Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| ProducerError::InvalidHttpMethod(method.to_string()))
}

/// A JSON array is the parameter list; any other value is a single parameter.
fn positional_params(body: &Body) -> Vec<Value> {
    match body {
        Body::Empty => Vec::new(),
        Body::Json(Value::Array(items)) => items.clone(),
        Body::Json(value) => vec![value.clone()],
        Body::Text(text) => vec![Value::String(text.clone())],
        Body::Bytes(bytes) => vec![Value::String(String::from_utf8_lossy(bytes).into_owned())],
        Body::Response(envelope) => vec![Value::String(envelope.text_lossy())],
    }
}

fn var_values(headers: &Headers) -> ProducerResult<Vec<String>> {
    match headers.get(names::VAR_VALUES) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                value_to_string(item).ok_or_else(|| {
                    ProducerError::invalid_header(names::VAR_VALUES, "path variable values must not be null")
                })
            })
            .collect(),
        Some(Value::Object(_)) => Err(ProducerError::invalid_header(
            names::VAR_VALUES,
            "expected an array of path variable values",
        )),
        Some(single) => Ok(value_to_string(single).into_iter().collect()),
    }
}

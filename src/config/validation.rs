//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the target address is an absolute http(s) URL
//! - Validate value ranges (timeouts > 0, cache size > 0)
//! - Check resource operations are resolvable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use reqwest::Method;
use std::collections::HashSet;
use thiserror::Error;
use url::Url;

use crate::client::resource::{ParamBinding, ResourceDescriptor};
use crate::config::schema::GatewayConfig;
use crate::producer::response::is_supported_charset;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(reason) = validate_address(&config.endpoint.address) {
        errors.push(ValidationError::new("endpoint.address", reason));
    }

    if !is_supported_charset(&config.endpoint.default_charset) {
        errors.push(ValidationError::new(
            "endpoint.default_charset",
            format!("unsupported charset '{}'", config.endpoint.default_charset),
        ));
    }

    if config.endpoint.max_client_cache_size == Some(0) {
        errors.push(ValidationError::new(
            "endpoint.max_client_cache_size",
            "must be greater than zero when set",
        ));
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::new("timeouts.connect_secs", "must be greater than zero"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than zero"));
    }

    if config.endpoint.features.iter().any(|f| f.trim().is_empty()) {
        errors.push(ValidationError::new("endpoint.features", "feature names must not be empty"));
    }

    if let Some(resource) = &config.resource {
        validate_resource(resource, &mut errors);
    } else if !config.endpoint.http_client_api {
        errors.push(ValidationError::new(
            "resource",
            "proxy mode is the default but no resource descriptor is configured",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check an address is an absolute http(s) URL.
pub fn validate_address(address: &str) -> Result<Url, String> {
    let url = Url::parse(address).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme '{}'", other)),
    }
}

fn validate_resource(resource: &ResourceDescriptor, errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();
    for (i, op) in resource.operations.iter().enumerate() {
        let field = format!("resource.operations[{}]", i);

        if op.name.trim().is_empty() {
            errors.push(ValidationError::new(&field, "operation name must not be empty"));
        }
        if !seen.insert((op.name.as_str(), op.params.len())) {
            errors.push(ValidationError::new(
                &field,
                format!("duplicate operation '{}' with {} parameter(s)", op.name, op.params.len()),
            ));
        }
        if Method::from_bytes(op.method.to_ascii_uppercase().as_bytes()).is_err() {
            errors.push(ValidationError::new(&field, format!("invalid HTTP method '{}'", op.method)));
        }
        if op.params.iter().filter(|p| matches!(p, ParamBinding::Body)).count() > 1 {
            errors.push(ValidationError::new(&field, "at most one body parameter is allowed"));
        }
        for param in &op.params {
            if let ParamBinding::Path(name) = param {
                if !op.path.contains(&format!("{{{}", name)) {
                    errors.push(ValidationError::new(
                        &field,
                        format!("path parameter '{}' does not appear in '{}'", name, op.path),
                    ));
                }
            }
        }
    }
}

//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::client::resource::ResourceDescriptor;
use crate::session::SessionScope;

/// Root configuration for a REST producer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Target endpoint and per-call defaults.
    pub endpoint: EndpointConfig,

    /// Client timeouts.
    pub timeouts: TimeoutConfig,

    /// TLS trust settings.
    pub tls: TlsConfig,

    /// Wire logging of requests and responses.
    pub logging: LoggingConfig,

    /// Header filter rules.
    pub headers: HeaderFilterConfig,

    /// Log output settings for the binary.
    pub observability: ObservabilityConfig,

    /// Resource descriptor used in proxy mode.
    pub resource: Option<ResourceDescriptor>,
}

/// Endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Default target address (e.g., "http://localhost:9000/customerservice").
    pub address: String,

    /// Use HTTP mode when the mode header is absent.
    pub http_client_api: bool,

    /// Raise non-2xx responses as errors unless overridden per call.
    pub throw_exception_on_failure: bool,

    /// Drop the message body on DELETE requests.
    pub ignore_delete_method_message_body: bool,

    /// Upper bound on cached clients; unbounded when absent.
    pub max_client_cache_size: Option<usize>,

    /// Cookie/session continuity scope.
    pub session_scope: SessionScope,

    /// Charset assumed when a response does not declare one.
    pub default_charset: String,

    /// Query parameters used when a request carries no query of its own.
    pub parameters: BTreeMap<String, String>,

    /// Names of registered client features to apply.
    pub features: Vec<String>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            address: "http://localhost:8080".to_string(),
            http_client_api: true,
            throw_exception_on_failure: true,
            ignore_delete_method_message_body: false,
            max_client_cache_size: None,
            session_scope: SessionScope::None,
            default_charset: "UTF-8".to_string(),
            parameters: BTreeMap::new(),
            features: Vec::new(),
        }
    }
}

/// Timeout configuration for the HTTP client.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Total request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// TLS trust configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq, Hash)]
#[serde(default)]
pub struct TlsConfig {
    /// Extra root certificate (PEM) to trust.
    pub ca_cert_path: Option<String>,

    /// Skip certificate verification. Test environments only.
    pub accept_invalid_certs: bool,
}

/// Wire logging options.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log every request and response at debug level.
    pub enabled: bool,

    /// Maximum number of body bytes included in a log line.
    pub body_limit: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            body_limit: 1024,
        }
    }
}

/// Header filter rules, applied after the fixed control-header denylist.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct HeaderFilterConfig {
    /// Header names never propagated.
    pub blocked: Vec<String>,

    /// Header name prefixes never propagated.
    pub blocked_prefixes: Vec<String>,

    /// Names re-admitted even when a rule above blocks them.
    pub allowed: Vec<String>,
}

impl Default for HeaderFilterConfig {
    fn default() -> Self {
        Self {
            blocked: Vec::new(),
            blocked_prefixes: vec!["Gateway".to_string()],
            allowed: Vec::new(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit ANSI colors.
    pub ansi: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            ansi: true,
        }
    }
}

//! Per-client invocation configuration and its cache fingerprint.

use bytes::Bytes;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use url::Url;

use crate::client::feature::{ClientFeature, ClientInterceptor};
use crate::client::resource::ResourceDescriptor;
use crate::config::validation::validate_address;
use crate::config::{GatewayConfig, LoggingConfig, TimeoutConfig, TlsConfig};
use crate::failure::{ProducerError, ProducerResult};
use crate::session::SessionScope;

/// Deterministic cache key for a [`ClientInvocationConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize)]
struct FingerprintParts<'a> {
    address: &'a str,
    http_client_api: bool,
    resource: Option<&'a ResourceDescriptor>,
    features: Vec<String>,
    interceptors: Vec<String>,
    tls: &'a TlsConfig,
    timeouts: &'a TimeoutConfig,
    logging: &'a LoggingConfig,
    session_scope: SessionScope,
}

/// Everything needed to construct one HTTP client. Immutable; per-call
/// variations produce a new value via the `with_*` methods.
#[derive(Debug, Clone)]
pub struct ClientInvocationConfig {
    address: Url,
    http_client_api: bool,
    resource: Option<Arc<ResourceDescriptor>>,
    features: Vec<Arc<dyn ClientFeature>>,
    interceptors: Vec<Arc<dyn ClientInterceptor>>,
    tls: TlsConfig,
    /// Contents of `tls.ca_cert_path`, read once when the TLS settings are set.
    ca_pem: Option<Bytes>,
    timeouts: TimeoutConfig,
    logging: LoggingConfig,
    session_scope: SessionScope,
}

impl ClientInvocationConfig {
    pub fn new(address: Url) -> Self {
        Self {
            address,
            http_client_api: true,
            resource: None,
            features: Vec::new(),
            interceptors: Vec::new(),
            tls: TlsConfig::default(),
            ca_pem: None,
            timeouts: TimeoutConfig::default(),
            logging: LoggingConfig::default(),
            session_scope: SessionScope::None,
        }
    }

    /// Derive the default config of a producer. Features are resolved by the
    /// caller.
    pub fn from_gateway_config(config: &GatewayConfig) -> ProducerResult<Self> {
        let address = parse_address(&config.endpoint.address)?;
        let ca_pem = read_ca_pem(&address, &config.tls)?;
        Ok(Self {
            address,
            http_client_api: config.endpoint.http_client_api,
            resource: config.resource.clone().map(Arc::new),
            features: Vec::new(),
            interceptors: Vec::new(),
            tls: config.tls.clone(),
            ca_pem,
            timeouts: config.timeouts.clone(),
            logging: config.logging.clone(),
            session_scope: config.endpoint.session_scope,
        })
    }

    pub fn address(&self) -> &Url {
        &self.address
    }

    pub fn http_client_api(&self) -> bool {
        self.http_client_api
    }

    pub fn resource(&self) -> Option<&Arc<ResourceDescriptor>> {
        self.resource.as_ref()
    }

    pub fn features(&self) -> &[Arc<dyn ClientFeature>] {
        &self.features
    }

    pub fn interceptors(&self) -> &[Arc<dyn ClientInterceptor>] {
        &self.interceptors
    }

    pub fn tls(&self) -> &TlsConfig {
        &self.tls
    }

    /// PEM trust roots loaded from `tls().ca_cert_path`.
    pub fn ca_pem(&self) -> Option<&Bytes> {
        self.ca_pem.as_ref()
    }

    pub fn timeouts(&self) -> &TimeoutConfig {
        &self.timeouts
    }

    pub fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    pub fn session_scope(&self) -> SessionScope {
        self.session_scope
    }

    pub fn with_address(mut self, address: Url) -> Self {
        self.address = address;
        self
    }

    pub fn with_http_client_api(mut self, http_client_api: bool) -> Self {
        self.http_client_api = http_client_api;
        self
    }

    pub fn with_resource(mut self, resource: ResourceDescriptor) -> Self {
        self.resource = Some(Arc::new(resource));
        self
    }

    pub fn with_features(mut self, features: Vec<Arc<dyn ClientFeature>>) -> Self {
        self.features = features;
        self
    }

    pub fn with_interceptor(mut self, interceptor: Arc<dyn ClientInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Replace the TLS settings, reading the CA file if one is named.
    pub fn with_tls(mut self, tls: TlsConfig) -> ProducerResult<Self> {
        self.ca_pem = read_ca_pem(&self.address, &tls)?;
        self.tls = tls;
        Ok(self)
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }

    pub fn with_session_scope(mut self, scope: SessionScope) -> Self {
        self.session_scope = scope;
        self
    }

    /// Compute the cache key. Features and interceptors contribute their
    /// settings, not just their names.
    pub fn fingerprint(&self) -> Fingerprint {
        let parts = FingerprintParts {
            address: self.address.as_str(),
            http_client_api: self.http_client_api,
            resource: self.resource.as_deref(),
            features: self.features.iter().map(|f| f.settings()).collect(),
            interceptors: self.interceptors.iter().map(|i| i.settings()).collect(),
            tls: &self.tls,
            timeouts: &self.timeouts,
            logging: &self.logging,
            session_scope: self.session_scope,
        };
        match serde_json::to_string(&parts) {
            Ok(key) => Fingerprint(key),
            Err(e) => {
                tracing::warn!(error = %e, "Falling back to debug fingerprint");
                Fingerprint(format!("{:?}", self))
            }
        }
    }
}

fn read_ca_pem(address: &Url, tls: &TlsConfig) -> ProducerResult<Option<Bytes>> {
    let Some(path) = &tls.ca_cert_path else {
        return Ok(None);
    };
    std::fs::read(path)
        .map(|pem| Some(Bytes::from(pem)))
        .map_err(|e| ProducerError::ClientConstruction {
            address: address.to_string(),
            reason: format!("cannot read CA certificate {}: {}", path, e),
        })
}

/// Parse and check a target address.
pub fn parse_address(address: &str) -> ProducerResult<Url> {
    validate_address(address).map_err(|reason| ProducerError::InvalidAddress {
        address: address.to_string(),
        reason,
    })
}

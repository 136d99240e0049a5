//! Client features and request/response interceptors.

use std::collections::BTreeMap;
use std::sync::Arc;

use reqwest::ClientBuilder;
use url::Url;

use crate::config::LoggingConfig;
use crate::failure::{ProducerError, ProducerResult};
use crate::observability::logging::preview;
use crate::producer::ResponseEnvelope;

/// Hook invoked around every call made through a client.
pub trait ClientInterceptor: Send + Sync + std::fmt::Debug {
    /// Stable name; contributes to the client fingerprint.
    fn name(&self) -> &str;

    /// Name plus any settings that change behaviour; contributes to the
    /// client fingerprint.
    fn settings(&self) -> String {
        self.name().to_string()
    }

    fn on_request(&self, _request: &mut reqwest::Request) {}

    fn on_response(&self, _uri: &Url, _response: &ResponseEnvelope) {}
}

/// Something applied to a client when it is constructed.
pub trait ClientFeature: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    /// Name plus any settings that change the built client.
    fn settings(&self) -> String {
        self.name().to_string()
    }

    fn configure(&self, builder: ClientBuilder) -> ClientBuilder {
        builder
    }

    fn interceptor(&self) -> Option<Arc<dyn ClientInterceptor>> {
        None
    }
}

/// Logs every request and response at debug level.
#[derive(Debug, Clone)]
pub struct LoggingFeature {
    body_limit: usize,
}

impl LoggingFeature {
    pub const NAME: &'static str = "logging";

    pub fn new(body_limit: usize) -> Self {
        Self { body_limit }
    }
}

impl ClientFeature for LoggingFeature {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn settings(&self) -> String {
        format!("{}:{}", Self::NAME, self.body_limit)
    }

    fn interceptor(&self) -> Option<Arc<dyn ClientInterceptor>> {
        Some(Arc::new(LoggingInterceptor {
            body_limit: self.body_limit,
        }))
    }
}

#[derive(Debug)]
pub struct LoggingInterceptor {
    body_limit: usize,
}

impl ClientInterceptor for LoggingInterceptor {
    fn name(&self) -> &str {
        LoggingFeature::NAME
    }

    fn settings(&self) -> String {
        format!("{}:{}", LoggingFeature::NAME, self.body_limit)
    }

    fn on_request(&self, request: &mut reqwest::Request) {
        let body = request
            .body()
            .and_then(|b| b.as_bytes())
            .map(|b| preview(b, self.body_limit))
            .unwrap_or_default();
        tracing::debug!(
            method = %request.method(),
            uri = %request.url(),
            headers = ?request.headers(),
            body = %body,
            "Outbound request"
        );
    }

    fn on_response(&self, uri: &Url, response: &ResponseEnvelope) {
        tracing::debug!(
            uri = %uri,
            status = response.status().as_u16(),
            headers = ?response.headers(),
            body = %preview(response.body(), self.body_limit),
            "Inbound response"
        );
    }
}

/// Sets a fixed `User-Agent` on the client.
#[derive(Debug, Clone)]
pub struct UserAgentFeature {
    user_agent: String,
}

impl UserAgentFeature {
    pub const NAME: &'static str = "user-agent";

    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }
}

impl Default for UserAgentFeature {
    fn default() -> Self {
        Self::new(concat!("rest-gateway/", env!("CARGO_PKG_VERSION")))
    }
}

impl ClientFeature for UserAgentFeature {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn settings(&self) -> String {
        format!("{}:{}", Self::NAME, self.user_agent)
    }

    fn configure(&self, builder: ClientBuilder) -> ClientBuilder {
        builder.user_agent(self.user_agent.clone())
    }
}

/// Named features available to configs and the feature-list header.
#[derive(Debug, Clone, Default)]
pub struct FeatureRegistry {
    features: BTreeMap<String, Arc<dyn ClientFeature>>,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in features.
    pub fn with_builtins(logging: &LoggingConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(LoggingFeature::new(logging.body_limit)));
        registry.register(Arc::new(UserAgentFeature::default()));
        registry
    }

    /// Register a feature under its own name, replacing any previous one.
    pub fn register(&mut self, feature: Arc<dyn ClientFeature>) {
        self.features.insert(feature.name().to_string(), feature);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ClientFeature>> {
        self.features.get(name).cloned()
    }

    /// Resolve a list of feature names. Unknown names are a configuration error.
    pub fn resolve(&self, names: &[String]) -> ProducerResult<Vec<Arc<dyn ClientFeature>>> {
        let mut resolved: Vec<Arc<dyn ClientFeature>> = Vec::with_capacity(names.len());
        for name in names {
            let feature = self
                .get(name)
                .ok_or_else(|| ProducerError::UnknownFeature(name.clone()))?;
            if !resolved.iter().any(|f| f.name() == feature.name()) {
                resolved.push(feature);
            }
        }
        Ok(resolved)
    }
}

//! The REST producer: one call per exchange.

use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

use crate::client::{
    ClientFactoryCache, ClientFeature, ClientInterceptor, ClientInvocationConfig, FeatureRegistry, LoggingFeature,
};
use crate::client::config::parse_address;
use crate::config::GatewayConfig;
use crate::exchange::{Body, Exchange, Headers, Message};
use crate::failure::{classify, ProducerError, ProducerResult, Report};
use crate::headers::translator::set_status_headers;
use crate::headers::{names, HeaderFilterStrategy, HeaderTranslator};
use crate::invocation::mode::parse_flag;
use crate::invocation::{Invocation, RequestContext, RequestDefaults};
use crate::observability::metrics;
use crate::producer::response::{coerce, ResponseEnvelope};
use crate::session::{self, SessionScope};

/// Labels collected while a call progresses, for metrics.
#[derive(Debug, Default)]
struct CallTrace {
    mode: &'static str,
    method: String,
    status: Option<u16>,
}

/// Invokes a remote REST service on behalf of an exchange.
#[derive(Debug)]
pub struct RestProducer {
    config: GatewayConfig,
    default_client: ClientInvocationConfig,
    cache: Arc<ClientFactoryCache>,
    registry: FeatureRegistry,
    translator: HeaderTranslator,
}

impl RestProducer {
    /// Producer with its own client cache, bounded as configured.
    pub fn new(config: GatewayConfig) -> ProducerResult<Self> {
        let cache = Arc::new(ClientFactoryCache::with_max_entries(
            config.endpoint.max_client_cache_size,
        ));
        Self::with_cache(config, cache)
    }

    /// Producer sharing an existing client cache.
    pub fn with_cache(config: GatewayConfig, cache: Arc<ClientFactoryCache>) -> ProducerResult<Self> {
        let registry = FeatureRegistry::with_builtins(&config.logging);
        let translator = HeaderTranslator::from_config(&config.headers, &config.endpoint.default_charset);
        let default_client = ClientInvocationConfig::from_gateway_config(&config)?;
        let features = registry.resolve(&configured_features(&config))?;

        Ok(Self {
            default_client: default_client.with_features(features),
            config,
            cache,
            registry,
            translator,
        })
    }

    /// Register an extra feature, usable from config or the feature header.
    pub fn with_feature(mut self, feature: Arc<dyn ClientFeature>) -> ProducerResult<Self> {
        self.registry.register(feature);
        let features = self.registry.resolve(&configured_features(&self.config))?;
        self.default_client = self.default_client.with_features(features);
        Ok(self)
    }

    /// Add an interceptor to every client this producer uses.
    pub fn with_interceptor(mut self, interceptor: Arc<dyn ClientInterceptor>) -> Self {
        self.default_client = self.default_client.with_interceptor(interceptor);
        self
    }

    /// Replace the header filter strategy.
    pub fn with_header_filter(mut self, filter: Arc<dyn HeaderFilterStrategy>) -> Self {
        self.translator = HeaderTranslator::new(filter, self.config.endpoint.default_charset.clone());
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn default_client_config(&self) -> &ClientInvocationConfig {
        &self.default_client
    }

    pub fn cache(&self) -> &Arc<ClientFactoryCache> {
        &self.cache
    }

    pub fn start(&self) {
        self.cache.reset_statistics();
        tracing::info!(address = %self.default_client.address(), "REST producer started");
    }

    pub fn stop(&self) {
        let dropped = self.cache.len();
        self.cache.clear();
        tracing::info!(clients = dropped, "REST producer stopped");
    }

    /// Perform the call described by the exchange's in message.
    ///
    /// On success (or a suppressed failure) the out message holds the
    /// inbound headers, the filtered response headers, the status headers and
    /// the body in the requested representation.
    pub async fn invoke(&self, exchange: &mut Exchange) -> ProducerResult<()> {
        let started = Instant::now();
        let span = tracing::info_span!("invoke", exchange_id = %exchange.id());
        let mut trace = CallTrace {
            mode: "unresolved",
            ..CallTrace::default()
        };

        let result = self.invoke_inner(exchange, &mut trace).instrument(span).await;

        metrics::record_invocation(trace.mode, &trace.method, trace.status, started.elapsed());
        if let Err(e) = &result {
            metrics::record_failure(e.category().as_str());
            tracing::warn!(
                exchange_id = %exchange.id(),
                category = e.category().as_str(),
                error = %e,
                "Invocation failed"
            );
        }
        result
    }

    async fn invoke_inner(&self, exchange: &mut Exchange, trace: &mut CallTrace) -> ProducerResult<()> {
        let in_headers = &exchange.in_message().headers;
        let client_config = self.resolve_client_config(in_headers)?;
        let throw_on_failure = self.throw_on_failure(in_headers)?;
        let client = self.cache.get(&client_config)?;

        let invocation = Invocation::resolve(exchange.in_message(), client.config().http_client_api())?;
        trace.mode = invocation.mode().as_str();

        let defaults = RequestDefaults {
            query: &self.config.endpoint.parameters,
            ignore_delete_body: self.config.endpoint.ignore_delete_method_message_body,
            charset: self.translator.default_charset(),
        };
        let mut ctx = RequestContext::build(
            invocation,
            exchange.in_message(),
            client.config().address(),
            client.config().resource().map(|r| r.as_ref()),
            &self.translator,
            defaults,
        )?;
        trace.method = ctx.method.to_string();
        let response_type = ctx.response_type;
        let uri = ctx.url.clone();

        let jar = session::resolve_jar(client.config().session_scope(), exchange, &client);
        if let Some(jar) = &jar {
            session::load_cookies(jar, &uri, &mut ctx.headers);
        }

        tracing::debug!(
            mode = trace.mode,
            method = %ctx.method,
            uri = %uri,
            operation = ctx.operation.as_deref().unwrap_or(""),
            "Invoking remote service"
        );

        let mut request = ctx.into_request(client.http())?;
        for interceptor in client.interceptors() {
            interceptor.on_request(&mut request);
        }

        let response = client
            .http()
            .execute(request)
            .await
            .map_err(|e| classify::transport(&uri, e))?;
        let status = response.status();
        trace.status = Some(status.as_u16());

        if let Some(jar) = &jar {
            session::store_cookies(jar, &uri, response.headers());
        }

        let charset = self.translator.response_charset(response.headers());
        let response_headers = self.translator.from_response_headers(response.headers());
        let body = response.bytes().await.map_err(|e| classify::transport(&uri, e))?;
        let envelope = ResponseEnvelope::new(status, response_headers, body, charset.clone());
        for interceptor in client.interceptors() {
            interceptor.on_response(&uri, &envelope);
        }
        exchange.set_charset(charset);

        tracing::debug!(uri = %uri, status = status.as_u16(), "Received response");

        let envelope = match classify::translate(&uri, envelope, throw_on_failure) {
            Report::Deliver(envelope) => envelope,
            Report::Raise(err) => return Err(err),
        };

        if !exchange.pattern().is_out_capable() {
            return Ok(());
        }

        let mut headers = exchange.in_message().headers.clone();
        headers.merge(envelope.headers().clone());
        set_status_headers(&mut headers, status);

        // Suppressed failures keep the envelope so status and body survive.
        let body = if envelope.is_success() {
            coerce(envelope, response_type)?
        } else {
            Body::Response(envelope)
        };
        exchange.set_out_message(Message { headers, body });
        Ok(())
    }

    /// Apply per-call address, feature and session overrides to the default
    /// config. The default config itself is never modified.
    fn resolve_client_config(&self, headers: &Headers) -> ProducerResult<ClientInvocationConfig> {
        let mut config = self.default_client.clone();

        if let Some(address) = headers.get_string(names::DESTINATION_OVERRIDE_URL) {
            config = config.with_address(parse_address(&address)?);
        }

        if let Some(value) = headers.get(names::FEATURES) {
            let requested = feature_names(value)?;
            config = config.with_features(self.registry.resolve(&requested)?);
        }

        if let Some(scope) = headers.get_string(names::SESSION_SCOPE) {
            let scope: SessionScope = scope
                .parse()
                .map_err(|reason| ProducerError::invalid_header(names::SESSION_SCOPE, reason))?;
            config = config.with_session_scope(scope);
        }

        Ok(config)
    }

    fn throw_on_failure(&self, headers: &Headers) -> ProducerResult<bool> {
        match headers.get(names::THROW_EXCEPTION_ON_FAILURE) {
            None | Some(Value::Null) => Ok(self.config.endpoint.throw_exception_on_failure),
            Some(Value::Bool(flag)) => Ok(*flag),
            Some(Value::String(s)) => parse_flag(s).ok_or_else(|| {
                ProducerError::invalid_header(
                    names::THROW_EXCEPTION_ON_FAILURE,
                    format!("expected a boolean but was '{}'", s),
                )
            }),
            Some(other) => Err(ProducerError::invalid_header(
                names::THROW_EXCEPTION_ON_FAILURE,
                format!("expected a boolean but was {}", other),
            )),
        }
    }
}

/// Configured feature names, plus wire logging when enabled.
fn configured_features(config: &GatewayConfig) -> Vec<String> {
    let mut names = config.endpoint.features.clone();
    if config.logging.enabled && !names.iter().any(|n| n == LoggingFeature::NAME) {
        names.push(LoggingFeature::NAME.to_string());
    }
    names
}

/// A feature list header is an array of names or a comma-separated string.
fn feature_names(value: &Value) -> ProducerResult<Vec<String>> {
    match value {
        Value::String(s) => Ok(s
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect()),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.trim().to_string()),
                other => Err(ProducerError::invalid_header(
                    names::FEATURES,
                    format!("feature names must be strings but found {}", other),
                )),
            })
            .collect(),
        other => Err(ProducerError::invalid_header(
            names::FEATURES,
            format!("expected a feature list but was {}", other),
        )),
    }
}

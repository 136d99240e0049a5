//! Memoized HTTP client construction.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use reqwest::cookie::Jar;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::client::config::{ClientInvocationConfig, Fingerprint};
use crate::client::feature::ClientInterceptor;
use crate::failure::{ProducerError, ProducerResult};
use crate::observability::metrics;
use crate::session::SessionScope;

/// A constructed client plus the config it was built from.
#[derive(Debug)]
pub struct CachedClient {
    config: ClientInvocationConfig,
    fingerprint: Fingerprint,
    http: reqwest::Client,
    interceptors: Vec<Arc<dyn ClientInterceptor>>,
    /// Shared by every call through this entry when the scope is `Instance`.
    cookie_jar: Option<Arc<Jar>>,
    created_at: Instant,
    last_used: AtomicU64,
}

impl CachedClient {
    /// Construct the underlying client.
    ///
    /// Fails on invalid TLS material or settings the HTTP stack rejects.
    pub fn build(config: ClientInvocationConfig) -> ProducerResult<Self> {
        let fingerprint = config.fingerprint();
        let construction_error = |reason: String| ProducerError::ClientConstruction {
            address: config.address().to_string(),
            reason,
        };

        let timeouts = config.timeouts();
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.request_secs))
            .redirect(reqwest::redirect::Policy::none())
            .danger_accept_invalid_certs(config.tls().accept_invalid_certs);

        if let Some(pem) = config.ca_pem() {
            let cert = reqwest::Certificate::from_pem(pem)
                .map_err(|e| construction_error(format!("invalid CA certificate: {}", e)))?;
            builder = builder.add_root_certificate(cert);
        }

        let mut interceptors: Vec<Arc<dyn ClientInterceptor>> = Vec::new();
        for feature in config.features() {
            builder = feature.configure(builder);
            if let Some(interceptor) = feature.interceptor() {
                interceptors.push(interceptor);
            }
        }
        interceptors.extend(config.interceptors().iter().cloned());

        let http = builder.build().map_err(|e| construction_error(e.to_string()))?;

        let cookie_jar = match config.session_scope() {
            SessionScope::Instance => Some(Arc::new(Jar::default())),
            SessionScope::None | SessionScope::Exchange => None,
        };

        tracing::debug!(
            address = %config.address(),
            features = config.features().len(),
            interceptors = interceptors.len(),
            "Constructed HTTP client"
        );

        Ok(Self {
            config,
            fingerprint,
            http,
            interceptors,
            cookie_jar,
            created_at: Instant::now(),
            last_used: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &ClientInvocationConfig {
        &self.config
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn interceptors(&self) -> &[Arc<dyn ClientInterceptor>] {
        &self.interceptors
    }

    pub fn cookie_jar(&self) -> Option<&Arc<Jar>> {
        self.cookie_jar.as_ref()
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    fn touch(&self, tick: u64) {
        self.last_used.fetch_max(tick, Ordering::Relaxed);
    }
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub constructions: u64,
    pub failures: u64,
    pub evictions: u64,
}

/// Fingerprint-keyed client cache.
///
/// At most one client is constructed per fingerprint, even under concurrent
/// first use. Failed constructions are not stored.
#[derive(Debug, Default)]
pub struct ClientFactoryCache {
    entries: DashMap<Fingerprint, Arc<CachedClient>>,
    max_entries: Option<usize>,
    tick: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    constructions: AtomicU64,
    failures: AtomicU64,
    evictions: AtomicU64,
}

impl ClientFactoryCache {
    /// Unbounded cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache evicting the least-recently-used entry beyond `max_entries`.
    pub fn bounded(max_entries: usize) -> Self {
        Self {
            max_entries: Some(max_entries.max(1)),
            ..Self::default()
        }
    }

    pub fn with_max_entries(max_entries: Option<usize>) -> Self {
        match max_entries {
            Some(max) => Self::bounded(max),
            None => Self::new(),
        }
    }

    /// Return the client for `config`, constructing it on first use.
    pub fn get(&self, config: &ClientInvocationConfig) -> ProducerResult<Arc<CachedClient>> {
        let fingerprint = config.fingerprint();
        let tick = self.tick.fetch_add(1, Ordering::Relaxed) + 1;

        if let Some(existing) = self.entries.get(&fingerprint) {
            existing.touch(tick);
            self.record_hit();
            return Ok(existing.value().clone());
        }

        // The entry guard holds the shard lock, so concurrent callers with the
        // same fingerprint wait here instead of building a second client.
        let client = match self.entries.entry(fingerprint) {
            Entry::Occupied(entry) => {
                entry.get().touch(tick);
                self.record_hit();
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                metrics::record_cache_lookup("miss");
                match CachedClient::build(config.clone()) {
                    Ok(client) => {
                        self.constructions.fetch_add(1, Ordering::Relaxed);
                        let client = Arc::new(client);
                        client.touch(tick);
                        entry.insert(client.clone());
                        client
                    }
                    Err(e) => {
                        self.failures.fetch_add(1, Ordering::Relaxed);
                        metrics::record_cache_lookup("failed");
                        tracing::warn!(address = %config.address(), error = %e, "Client construction failed");
                        return Err(e);
                    }
                }
            }
        };

        self.evict_excess(client.fingerprint());
        metrics::record_cache_size(self.entries.len());
        Ok(client)
    }

    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        metrics::record_cache_lookup("hit");
    }

    /// Must be called without any entry guard held.
    fn evict_excess(&self, keep: &Fingerprint) {
        let Some(max) = self.max_entries else {
            return;
        };
        while self.entries.len() > max {
            let victim = self
                .entries
                .iter()
                .filter(|e| e.key() != keep)
                .min_by_key(|e| e.value().last_used.load(Ordering::Relaxed))
                .map(|e| e.key().clone());
            let Some(victim) = victim else {
                break;
            };
            if self.entries.remove(&victim).is_some() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                metrics::record_cache_eviction();
                tracing::debug!(fingerprint = %victim, "Evicted least recently used client");
            }
        }
    }

    pub fn contains(&self, config: &ClientInvocationConfig) -> bool {
        self.entries.contains_key(&config.fingerprint())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> Option<usize> {
        self.max_entries
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            constructions: self.constructions.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    pub fn reset_statistics(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.constructions.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
    }

    /// Drop every cached client.
    pub fn clear(&self) {
        self.entries.clear();
        metrics::record_cache_size(0);
    }
}

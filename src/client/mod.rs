//! HTTP client construction and caching subsystem.
//!
//! # Data Flow
//! ```text
//! GatewayConfig + per-call headers
//!     → config.rs (ClientInvocationConfig, immutable)
//!     → fingerprint (address + serialized settings + feature names)
//!     → cache.rs (get-or-construct under the DashMap entry lock)
//!     → CachedClient { reqwest::Client, interceptors, optional cookie jar }
//! ```
//!
//! # Design Decisions
//! - The cache is an owned value shared through `Arc`, never a global
//! - Construction runs at most once per fingerprint; failures are not stored
//! - Per-call address overrides produce a new config and a new fingerprint,
//!   leaving the default entry untouched
//! - Features and interceptors are trait objects named for fingerprinting

pub mod cache;
pub mod config;
pub mod feature;
pub mod resource;

pub use cache::{CacheStats, CachedClient, ClientFactoryCache};
pub use config::{ClientInvocationConfig, Fingerprint};
pub use feature::{ClientFeature, ClientInterceptor, FeatureRegistry, LoggingFeature, UserAgentFeature};
pub use resource::{OperationDescriptor, ParamBinding, ResourceDescriptor};

//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → RestProducer::new derives the default ClientInvocationConfig
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; per-call variation goes through headers
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::EndpointConfig;
pub use schema::GatewayConfig;
pub use schema::HeaderFilterConfig;
pub use schema::LoggingConfig;
pub use schema::ObservabilityConfig;
pub use schema::TimeoutConfig;
pub use schema::TlsConfig;

//! REST gateway library.
//!
//! Turns header/body oriented exchanges into outbound HTTP invocations and
//! maps the responses back onto the exchange.

pub mod client;
pub mod config;
pub mod exchange;
pub mod failure;
pub mod headers;
pub mod invocation;
pub mod observability;
pub mod producer;
pub mod session;

pub use client::{CachedClient, ClientFactoryCache, ClientInvocationConfig};
pub use config::GatewayConfig;
pub use exchange::{Body, Exchange, ExchangePattern, Headers, Message};
pub use failure::{OperationFailure, ProducerError, ProducerResult};
pub use producer::{ResponseEnvelope, ResponseType, RestProducer};
pub use session::SessionScope;

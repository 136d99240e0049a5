//! Exchange carrier subsystem.
//!
//! # Data Flow
//! ```text
//! caller builds Message (headers + body)
//!     → wraps it in an Exchange (id, pattern, charset, session jar)
//!     → RestProducer::invoke reads the in message
//!     → out message populated on success (in-out pattern only)
//! ```
//!
//! # Design Decisions
//! - Header values are `serde_json::Value` so control headers can carry
//!   flags, maps and arrays without a type registry
//! - Header lookups are case-insensitive; insertion order is preserved
//! - The exchange owns its session jar so exchange-scoped cookies never leak

pub mod exchange;
pub mod message;

pub use exchange::{Exchange, ExchangePattern};
pub use message::{Body, Headers, Message};

//! Header translation subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound:
//!     message Headers
//!         → names.rs (drop control headers)
//!         → filter.rs (strategy: internal prefix, hop-by-hop, configured rules)
//!         → translator.rs (Value → HeaderValue)
//!         → reqwest HeaderMap
//!
//! Inbound:
//!     reqwest HeaderMap
//!         → filter.rs (inbound rules)
//!         → translator.rs (multi-value → array, charset extraction)
//!         → message Headers + status headers
//!
//! URI shaping:
//!     uri.rs (path join, {placeholder} substitution, query plan)
//! ```
//!
//! # Design Decisions
//! - Filtering is a pure function of (name, direction)
//! - Control headers are denied in both directions regardless of strategy
//! - Invalid wire names/values are skipped, not fatal

pub mod filter;
pub mod names;
pub mod translator;
pub mod uri;

pub use filter::{DefaultHeaderFilter, Direction, HeaderFilterStrategy};
pub use translator::HeaderTranslator;
pub use uri::QueryPlan;

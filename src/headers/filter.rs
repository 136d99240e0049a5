//! Header filter strategies.

use std::collections::HashSet;

use crate::config::HeaderFilterConfig;
use crate::headers::names::is_control_header;

/// Direction a header is travelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Message → wire request.
    Outbound,
    /// Wire response → message.
    Inbound,
}

/// Decides whether a header may cross the message/wire boundary.
pub trait HeaderFilterStrategy: Send + Sync + std::fmt::Debug {
    /// Returns true if the header must not be propagated.
    fn should_block(&self, name: &str, direction: Direction) -> bool;
}

/// Headers owned by the transport on the way out.
const OUTBOUND_TRANSPORT_HEADERS: &[&str] = &[
    "content-length",
    "host",
    "connection",
    "keep-alive",
    "transfer-encoding",
    "te",
    "trailer",
    "upgrade",
    "proxy-connection",
    "proxy-authenticate",
];

/// Hop-by-hop headers dropped on the way in.
const INBOUND_TRANSPORT_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "transfer-encoding",
    "te",
    "trailer",
    "upgrade",
    "proxy-connection",
];

/// Prefix/name based filter.
///
/// Control headers are always blocked. Otherwise a header is blocked when it
/// matches a transport header for its direction, a blocked name, or a blocked
/// prefix, unless it is on the allow list.
#[derive(Debug, Clone)]
pub struct DefaultHeaderFilter {
    blocked: HashSet<String>,
    blocked_prefixes: Vec<String>,
    allowed: HashSet<String>,
}

impl DefaultHeaderFilter {
    pub fn new(
        blocked: impl IntoIterator<Item = String>,
        blocked_prefixes: impl IntoIterator<Item = String>,
        allowed: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            blocked: blocked.into_iter().map(|s| s.to_ascii_lowercase()).collect(),
            blocked_prefixes: blocked_prefixes
                .into_iter()
                .map(|s| s.to_ascii_lowercase())
                .collect(),
            allowed: allowed.into_iter().map(|s| s.to_ascii_lowercase()).collect(),
        }
    }

    pub fn from_config(config: &HeaderFilterConfig) -> Self {
        Self::new(
            config.blocked.iter().cloned(),
            config.blocked_prefixes.iter().cloned(),
            config.allowed.iter().cloned(),
        )
    }
}

impl Default for DefaultHeaderFilter {
    fn default() -> Self {
        Self::from_config(&HeaderFilterConfig::default())
    }
}

impl HeaderFilterStrategy for DefaultHeaderFilter {
    fn should_block(&self, name: &str, direction: Direction) -> bool {
        if is_control_header(name) {
            return true;
        }

        let lower = name.to_ascii_lowercase();
        if self.allowed.contains(&lower) {
            return false;
        }

        let transport = match direction {
            Direction::Outbound => OUTBOUND_TRANSPORT_HEADERS,
            Direction::Inbound => INBOUND_TRANSPORT_HEADERS,
        };
        transport.contains(&lower.as_str())
            || self.blocked.contains(&lower)
            || self.blocked_prefixes.iter().any(|p| lower.starts_with(p))
    }
}

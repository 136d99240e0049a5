//! Cookie/session continuity.
//!
//! # Data Flow
//! ```text
//! SessionScope (config default, or per-call header)
//!     → resolve_jar: None | Exchange jar | CachedClient jar
//!     → load_cookies: jar → `Cookie` request header
//!     → (network call)
//!     → store_cookies: `Set-Cookie` response headers → jar
//! ```
//!
//! # Design Decisions
//! - Cookies are handled per call rather than by the client's own cookie
//!   store, so one client can serve exchange-scoped jars
//! - `Set-Cookie` is stored for every response, including failures
//! - Instance jars are shared across tasks; ordering races are accepted

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, SET_COOKIE};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use url::Url;

use crate::client::CachedClient;
use crate::exchange::Exchange;

/// Where cookies live between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionScope {
    /// Stateless.
    #[default]
    None,
    /// Jar carried on the exchange.
    Exchange,
    /// Jar owned by the cached client and shared by all its calls.
    Instance,
}

impl FromStr for SessionScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(SessionScope::None),
            "exchange" => Ok(SessionScope::Exchange),
            "instance" => Ok(SessionScope::Instance),
            other => Err(format!("unknown session scope '{}'", other)),
        }
    }
}

/// Pick the jar for this call, creating an exchange jar on demand.
pub fn resolve_jar(
    scope: SessionScope,
    exchange: &mut Exchange,
    client: &CachedClient,
) -> Option<Arc<Jar>> {
    match scope {
        SessionScope::None => None,
        SessionScope::Exchange => Some(exchange.session_or_create()),
        SessionScope::Instance => client.cookie_jar().cloned(),
    }
}

/// Add the jar's cookies for `url` to the request headers. Cookies the
/// caller already set come first in the merged header.
pub fn load_cookies(jar: &Jar, url: &Url, headers: &mut HeaderMap) {
    let Some(cookies) = jar.cookies(url) else {
        return;
    };
    let mut merged: Vec<u8> = Vec::new();
    for existing in headers.get_all(COOKIE) {
        merged.extend_from_slice(existing.as_bytes());
        merged.extend_from_slice(b"; ");
    }
    if merged.is_empty() {
        headers.insert(COOKIE, cookies);
        return;
    }
    merged.extend_from_slice(cookies.as_bytes());
    match HeaderValue::from_bytes(&merged) {
        Ok(value) => {
            headers.insert(COOKIE, value);
        }
        Err(_) => {
            headers.append(COOKIE, cookies);
        }
    }
}

/// Store any `Set-Cookie` headers of a response.
pub fn store_cookies(jar: &Jar, url: &Url, headers: &HeaderMap) {
    let mut set_cookies = headers.get_all(SET_COOKIE).iter().peekable();
    if set_cookies.peek().is_some() {
        jar.set_cookies(&mut set_cookies, url);
    }
}

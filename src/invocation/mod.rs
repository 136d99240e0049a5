//! Invocation subsystem.
//!
//! # Data Flow
//! ```text
//! inbound Message
//!     → mode.rs (mode flag → Invocation::Proxy | Invocation::Http)
//!     → request.rs (URL, filtered headers, body → RequestContext)
//!     → RequestContext::into_request (reqwest::Request on the cached client)
//! ```
//!
//! # Design Decisions
//! - The mode is chosen only from the mode header and the endpoint default
//! - Configuration errors surface here, before any network call
//! - GET and HEAD never carry a body

pub mod mode;
pub mod request;

pub use mode::{Invocation, InvocationMode};
pub use request::{RequestBody, RequestContext, RequestDefaults};

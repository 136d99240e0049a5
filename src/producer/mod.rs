//! Producer core.
//!
//! # Data Flow
//! ```text
//! Exchange (in message)
//!     → resolve ClientInvocationConfig (address / feature / session overrides)
//!     → ClientFactoryCache::get
//!     → Invocation::resolve → RequestContext
//!     → session cookies in, interceptors, execute
//!     → session cookies out, ResponseEnvelope
//!     → classify::translate (deliver or raise)
//!     → coerce body → out message
//! ```
//!
//! # Design Decisions
//! - The network call is awaited by the calling task; no retries
//! - Non-2xx responses delivered under suppression keep the raw envelope
//! - In-only exchanges get no out message, but failures are still raised

pub mod producer;
pub mod response;

pub use producer::RestProducer;
pub use response::{coerce, ElementType, ResponseEnvelope, ResponseType};

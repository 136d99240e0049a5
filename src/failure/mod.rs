//! Failure classification subsystem.
//!
//! # Data Flow
//! ```text
//! reqwest::Error            → classify::transport()  → ProducerError::Transport
//! ResponseEnvelope (status) → classify::translate()  → Report::Deliver | Report::Raise
//!                                   │
//!                                   └─ non-2xx + throw → OperationFailure
//! ```
//!
//! # Design Decisions
//! - Classification is a pure function of the status code
//! - The throw-on-failure flag only picks the reporting channel
//! - Configuration errors are raised before any network I/O and never retried

pub mod classify;
pub mod error;
pub mod operation;

pub use classify::{classify_status, translate, Classification, Report};
pub use error::{ErrorCategory, ProducerError, ProducerResult, TransportKind};
pub use operation::OperationFailure;

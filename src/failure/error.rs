//! Producer error taxonomy.

use thiserror::Error;

use crate::failure::operation::OperationFailure;

/// Broad error family, used for logging and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Raised before any network call; never retried.
    Configuration,
    /// Connectivity, TLS or timeout failure.
    Transport,
    /// Non-2xx response.
    Protocol,
    /// Response processing failure.
    Runtime,
}

impl ErrorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Transport => "transport",
            ErrorCategory::Protocol => "protocol",
            ErrorCategory::Runtime => "runtime",
        }
    }
}

/// What went wrong at the transport level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Connect,
    Timeout,
    Request,
    Body,
    Other,
}

impl TransportKind {
    pub fn from_error(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            TransportKind::Timeout
        } else if error.is_connect() {
            TransportKind::Connect
        } else if error.is_body() || error.is_decode() {
            TransportKind::Body
        } else if error.is_request() {
            TransportKind::Request
        } else {
            TransportKind::Other
        }
    }
}

/// Errors that can occur while invoking an upstream service.
#[derive(Debug, Error)]
pub enum ProducerError {
    /// Proxy mode was selected without an operation name.
    #[error("Header {0} is required in proxy mode")]
    MissingOperationName(&'static str),

    /// HTTP mode was selected without an HTTP method.
    #[error("Header {0} is required in HTTP mode")]
    MissingHttpMethod(&'static str),

    #[error("Invalid HTTP method: {0}")]
    InvalidHttpMethod(String),

    #[error("Invalid target address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// Proxy mode needs a resource descriptor to resolve operations.
    #[error("Proxy mode requires a resource descriptor")]
    MissingResource,

    #[error("Cannot find operation '{name}' taking {arity} parameter(s) on resource '{resource}'")]
    UnknownOperation {
        resource: String,
        name: String,
        arity: usize,
    },

    /// A control header carried a value of the wrong shape.
    #[error("Invalid value for header {header}: {reason}")]
    InvalidHeader { header: String, reason: String },

    #[error("Unresolved path variable '{name}' in template '{template}'")]
    UnresolvedPathVariable { template: String, name: String },

    #[error("Unknown client feature: {0}")]
    UnknownFeature(String),

    /// Building the underlying HTTP client failed. Not cached.
    #[error("Failed to construct client for {address}: {reason}")]
    ClientConstruction { address: String, reason: String },

    #[error("Transport failure invoking {uri}: {source}")]
    Transport {
        uri: String,
        kind: TransportKind,
        #[source]
        source: reqwest::Error,
    },

    #[error(transparent)]
    Operation(Box<OperationFailure>),

    #[error("Failed to process response: {0}")]
    ResponseProcessing(String),
}

impl ProducerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ProducerError::Transport { .. } => ErrorCategory::Transport,
            ProducerError::Operation(_) => ErrorCategory::Protocol,
            ProducerError::ResponseProcessing(_) => ErrorCategory::Runtime,
            _ => ErrorCategory::Configuration,
        }
    }

    /// The classified protocol failure, if this is one.
    pub fn operation_failure(&self) -> Option<&OperationFailure> {
        match self {
            ProducerError::Operation(failure) => Some(failure),
            _ => None,
        }
    }

    pub(crate) fn invalid_header(header: &str, reason: impl Into<String>) -> Self {
        ProducerError::InvalidHeader {
            header: header.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<OperationFailure> for ProducerError {
    fn from(failure: OperationFailure) -> Self {
        ProducerError::Operation(Box::new(failure))
    }
}

/// Result type for producer operations.
pub type ProducerResult<T> = Result<T, ProducerError>;

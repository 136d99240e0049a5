//! Status classification and reporting.

use reqwest::StatusCode;
use url::Url;

use crate::failure::error::{ProducerError, TransportKind};
use crate::failure::operation::OperationFailure;
use crate::producer::ResponseEnvelope;

/// Outcome class of a received status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Success,
    Failure,
}

/// How a classified response is reported to the caller.
#[derive(Debug)]
pub enum Report {
    /// Delivered as the outbound message body.
    Deliver(ResponseEnvelope),
    /// Raised as an error.
    Raise(ProducerError),
}

/// Only the 2xx family counts as success.
pub fn classify_status(status: StatusCode) -> Classification {
    if status.is_success() {
        Classification::Success
    } else {
        Classification::Failure
    }
}

/// Decide how a response is reported.
///
/// `throw_on_failure` never changes the classification, only whether a
/// failure is raised or delivered as data.
pub fn translate(uri: &Url, envelope: ResponseEnvelope, throw_on_failure: bool) -> Report {
    match classify_status(envelope.status()) {
        Classification::Success => Report::Deliver(envelope),
        Classification::Failure if throw_on_failure => {
            let failure = OperationFailure::from_envelope(uri.as_str(), &envelope);
            Report::Raise(failure.into())
        }
        Classification::Failure => Report::Deliver(envelope),
    }
}

/// Wrap a transport failure, keeping the original cause.
pub fn transport(uri: &Url, source: reqwest::Error) -> ProducerError {
    ProducerError::Transport {
        uri: uri.to_string(),
        kind: TransportKind::from_error(&source),
        source,
    }
}

//! The exchange passed through the producer.

use reqwest::cookie::Jar;
use std::sync::Arc;
use uuid::Uuid;

use crate::exchange::message::Message;

/// Whether the caller expects a reply message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExchangePattern {
    InOnly,
    #[default]
    InOut,
}

impl ExchangePattern {
    pub fn is_out_capable(self) -> bool {
        matches!(self, ExchangePattern::InOut)
    }
}

/// A single request/reply interaction.
#[derive(Debug)]
pub struct Exchange {
    id: Uuid,
    pattern: ExchangePattern,
    in_message: Message,
    out_message: Option<Message>,
    /// Effective charset of the last response.
    charset: Option<String>,
    /// Exchange-scoped cookie jar, created on demand.
    session: Option<Arc<Jar>>,
}

impl Exchange {
    /// Create an in-out exchange around the given message.
    pub fn new(message: Message) -> Self {
        Self::with_pattern(message, ExchangePattern::InOut)
    }

    /// Create an in-only exchange; the response body is discarded.
    pub fn in_only(message: Message) -> Self {
        Self::with_pattern(message, ExchangePattern::InOnly)
    }

    pub fn with_pattern(message: Message, pattern: ExchangePattern) -> Self {
        Self {
            id: Uuid::new_v4(),
            pattern,
            in_message: message,
            out_message: None,
            charset: None,
            session: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn pattern(&self) -> ExchangePattern {
        self.pattern
    }

    pub fn in_message(&self) -> &Message {
        &self.in_message
    }

    pub fn in_message_mut(&mut self) -> &mut Message {
        &mut self.in_message
    }

    pub fn out_message(&self) -> Option<&Message> {
        self.out_message.as_ref()
    }

    pub fn set_out_message(&mut self, message: Message) {
        self.out_message = Some(message);
    }

    pub fn take_out_message(&mut self) -> Option<Message> {
        self.out_message.take()
    }

    /// The current message: the out message if one was produced, otherwise
    /// the in message.
    pub fn message(&self) -> &Message {
        self.out_message.as_ref().unwrap_or(&self.in_message)
    }

    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    pub fn set_charset(&mut self, charset: impl Into<String>) {
        self.charset = Some(charset.into());
    }

    /// The exchange-scoped cookie jar, if one has been created or threaded in.
    pub fn session(&self) -> Option<&Arc<Jar>> {
        self.session.as_ref()
    }

    /// Thread an existing cookie jar into this exchange so that a later call
    /// continues the session captured by an earlier one.
    pub fn with_session(mut self, jar: Arc<Jar>) -> Self {
        self.session = Some(jar);
        self
    }

    /// Get the exchange-scoped jar, creating it on first use.
    pub fn session_or_create(&mut self) -> Arc<Jar> {
        self.session.get_or_insert_with(|| Arc::new(Jar::default())).clone()
    }
}

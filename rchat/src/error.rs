//! Chat-layer errors and classification.

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorKind {
    /// Rejected before any mutation or network call; never retried.
    Validation,
    /// Converted from an adapter failure, provider identity included.
    Provider,
    /// Durable write failed; in-memory conversation state remains valid, so
    /// the save may be retried without re-running the model call.
    Persistence,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatError {
    pub kind: ChatErrorKind,
    pub message: String,
}

impl ChatError {
    pub fn new(kind: ChatErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Validation, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Provider, message)
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Persistence, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::NotFound, message)
    }
}

impl Display for ChatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ChatError {}

impl From<rprovider::AdapterError> for ChatError {
    fn from(value: rprovider::AdapterError) -> Self {
        ChatError::provider(value.to_string())
    }
}

//! Shared adapter error kinds and error value helpers.
//!
//! ```rust
//! use rprovider::{AdapterError, ProviderKind};
//!
//! let auth = AdapterError::authentication("bad key");
//! assert!(!auth.retryable);
//!
//! let upstream = AdapterError::provider(ProviderKind::OpenAi, "quota exceeded");
//! assert_eq!(upstream.provider, Some(ProviderKind::OpenAi));
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::ProviderKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterErrorKind {
    Authentication,
    RateLimited,
    InvalidRequest,
    Timeout,
    Transport,
    Unavailable,
    Provider,
    Configuration,
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterError {
    pub kind: AdapterErrorKind,
    pub provider: Option<ProviderKind>,
    pub message: String,
    pub retryable: bool,
}

impl AdapterError {
    pub fn new(kind: AdapterErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            provider: None,
            message: message.into(),
            retryable,
        }
    }

    pub fn with_provider(mut self, provider: ProviderKind) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(AdapterErrorKind::Authentication, message, false)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(AdapterErrorKind::RateLimited, message, true)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(AdapterErrorKind::InvalidRequest, message, false)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(AdapterErrorKind::Timeout, message, true)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(AdapterErrorKind::Transport, message, true)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(AdapterErrorKind::Unavailable, message, true)
    }

    /// Structured error envelope returned by a backend, tagged with the
    /// provider it came from so callers never have to inspect wire shapes.
    pub fn provider(provider: ProviderKind, message: impl Into<String>) -> Self {
        Self::new(AdapterErrorKind::Provider, message, false).with_provider(provider)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(AdapterErrorKind::Configuration, message, false)
    }

    pub fn unsupported(provider: ProviderKind, message: impl Into<String>) -> Self {
        Self::new(AdapterErrorKind::Unsupported, message, false).with_provider(provider)
    }
}

impl Display for AdapterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.provider {
            Some(provider) => write!(f, "{provider} {:?}: {}", self.kind, self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl Error for AdapterError {}

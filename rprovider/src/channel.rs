//! Channel configuration: one credential/endpoint bundle per provider
//! deployment. Read-only after load; reconfiguration means a new value.
//!
//! ```rust
//! use rprovider::{ChannelConfig, ProviderKind};
//!
//! let channel = ChannelConfig::new("main", ProviderKind::OpenAi, "https://api.openai.com/v1")
//!     .with_secrets(vec!["sk-test".to_string()])
//!     .with_models(vec!["gpt-4o-mini".to_string()]);
//!
//! assert!(channel.supports_model("gpt-4o-mini"));
//! assert_eq!(channel.split_secret().unwrap(), vec!["sk-test".to_string()]);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{AdapterError, ProviderKind};

#[derive(Debug)]
pub struct ChannelConfig {
    pub name: String,
    pub provider: ProviderKind,
    pub endpoint: String,
    models: Vec<String>,
    secrets: Vec<String>,
    cursor: AtomicUsize,
}

impl ChannelConfig {
    pub fn new(
        name: impl Into<String>,
        provider: ProviderKind,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            provider,
            endpoint: endpoint.into(),
            models: Vec::new(),
            secrets: Vec::new(),
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn with_secrets(mut self, secrets: Vec<String>) -> Self {
        self.secrets = secrets;
        self
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = models;
        self
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn supports_model(&self, model: &str) -> bool {
        self.models.iter().any(|candidate| candidate == model)
    }

    /// Picks one configured secret bundle, rotating across calls so multiple
    /// keys on one channel share load.
    pub fn pick_secret(&self) -> Result<&str, AdapterError> {
        if self.secrets.is_empty() {
            return Err(AdapterError::configuration(format!(
                "channel '{}' has no secrets configured",
                self.name
            )));
        }

        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.secrets.len();
        Ok(self.secrets[index].as_str())
    }

    /// Picks a secret bundle and splits it on `|` into the provider kind's
    /// expected arity. A wrong part count is a configuration error surfaced
    /// here, at resolution time, never silently defaulted.
    pub fn split_secret(&self) -> Result<Vec<String>, AdapterError> {
        let arity = self.provider.secret_arity();
        let secret = self.pick_secret()?;
        let parts = secret.split('|').map(str::to_string).collect::<Vec<_>>();

        if parts.len() != arity {
            return Err(AdapterError::configuration(format!(
                "channel '{}' secret has {} part(s), {} expects {}",
                self.name,
                parts.len(),
                self.provider,
                arity
            )));
        }

        Ok(parts)
    }
}

impl Clone for ChannelConfig {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            provider: self.provider,
            endpoint: self.endpoint.clone(),
            models: self.models.clone(),
            secrets: self.secrets.clone(),
            cursor: AtomicUsize::new(0),
        }
    }
}

//! Stable construction surface for facade consumers: a channel table in,
//! a ready registry out.

use std::sync::Arc;
use std::time::Duration;

use robserve::{SafeProviderHooks, TracingObservabilityHooks};
use rprovider::{AdapterError, AdapterRegistry, ChannelConfig, RetryPolicy};

#[derive(Debug, Clone)]
pub struct RegistryBuildConfig {
    pub channels: Vec<ChannelConfig>,
    pub timeout: Duration,
    pub retry: Option<RetryPolicy>,
}

impl RegistryBuildConfig {
    pub fn new(channels: Vec<ChannelConfig>) -> Self {
        Self {
            channels,
            timeout: Duration::from_secs(90),
            retry: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }
}

/// Builds the adapter registry over a shared HTTP client. When a retry
/// policy is configured, resolved adapters are decorated with retry and
/// report attempts through panic-safe tracing hooks.
pub fn build_registry(config: RegistryBuildConfig) -> Result<AdapterRegistry, AdapterError> {
    let client = reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|err| AdapterError::transport(err.to_string()))?;

    let transport = Arc::new(rprovider::ReqwestTransport::new(client));
    let mut registry = AdapterRegistry::new(transport).with_channels(config.channels);

    if let Some(policy) = config.retry {
        registry = registry.with_retry(
            policy,
            Arc::new(SafeProviderHooks::new(TracingObservabilityHooks)),
        );
    }

    Ok(registry)
}

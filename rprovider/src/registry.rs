//! Adapter registry: maps configured channels and model names to concrete
//! adapter instances built from credentials.
//!
//! Adapters are immutable after construction; the registry caches them per
//! channel and never mutates credentials at runtime. Reconfiguring a channel
//! means building a new registry.

use std::sync::{Arc, Mutex, MutexGuard};

use rcommon::Registry;

use crate::{
    AdapterError, ChannelConfig, HttpTransport, ProviderAdapter, ProviderKind,
    ProviderOperationHooks, RetryPolicy, RetryingAdapter,
};

struct RetryConfig {
    policy: RetryPolicy,
    hooks: Arc<dyn ProviderOperationHooks>,
}

pub struct AdapterRegistry {
    transport: Arc<dyn HttpTransport>,
    channels: Vec<ChannelConfig>,
    cache: Mutex<Registry<String, Arc<dyn ProviderAdapter>>>,
    retry: Option<RetryConfig>,
}

impl AdapterRegistry {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            channels: Vec::new(),
            cache: Mutex::new(Registry::new()),
            retry: None,
        }
    }

    pub fn with_channel(mut self, channel: ChannelConfig) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn with_channels(mut self, channels: Vec<ChannelConfig>) -> Self {
        self.channels.extend(channels);
        self
    }

    /// Decorates every resolved adapter with retry-on-retryable-failure for
    /// the restartable operations, reporting attempts through `hooks`.
    pub fn with_retry(
        mut self,
        policy: RetryPolicy,
        hooks: Arc<dyn ProviderOperationHooks>,
    ) -> Self {
        self.retry = Some(RetryConfig { policy, hooks });
        self
    }

    pub fn channels(&self) -> &[ChannelConfig] {
        &self.channels
    }

    /// Resolves a channel to its adapter, building and caching it on first
    /// use. A malformed secret bundle fails here, before any adapter state
    /// exists; nothing partially constructed is ever cached.
    pub fn resolve(
        &self,
        channel: &ChannelConfig,
    ) -> Result<Arc<dyn ProviderAdapter>, AdapterError> {
        if let Some(adapter) = self.cache()?.get(channel.name.as_str()) {
            return Ok(Arc::clone(adapter));
        }

        let adapter = self.build_adapter(channel)?;
        let adapter = match &self.retry {
            Some(retry) => Arc::new(RetryingAdapter::new(
                adapter,
                retry.policy.clone(),
                Arc::clone(&retry.hooks),
            )) as Arc<dyn ProviderAdapter>,
            None => adapter,
        };

        self.cache()?
            .insert(channel.name.clone(), Arc::clone(&adapter));
        Ok(adapter)
    }

    /// Resolves a model name through the first channel that lists it.
    pub fn resolve_model(&self, model: &str) -> Result<Arc<dyn ProviderAdapter>, AdapterError> {
        let channel = self
            .channels
            .iter()
            .find(|channel| channel.supports_model(model))
            .ok_or_else(|| {
                AdapterError::configuration(format!("no channel serves model '{model}'"))
            })?;

        self.resolve(channel)
    }

    fn build_adapter(
        &self,
        channel: &ChannelConfig,
    ) -> Result<Arc<dyn ProviderAdapter>, AdapterError> {
        match channel.provider {
            ProviderKind::OpenAi => build_openai(Arc::clone(&self.transport), channel),
            ProviderKind::Azure => build_azure(Arc::clone(&self.transport), channel),
            ProviderKind::Zhinao => build_zhinao(Arc::clone(&self.transport), channel),
        }
    }

    fn cache(
        &self,
    ) -> Result<MutexGuard<'_, Registry<String, Arc<dyn ProviderAdapter>>>, AdapterError> {
        self.cache
            .lock()
            .map_err(|_| AdapterError::configuration("adapter cache lock poisoned"))
    }
}

#[cfg(feature = "provider-openai")]
fn build_openai(
    transport: Arc<dyn HttpTransport>,
    channel: &ChannelConfig,
) -> Result<Arc<dyn ProviderAdapter>, AdapterError> {
    Ok(Arc::new(crate::adapters::openai::OpenAiAdapter::from_channel(
        transport, channel,
    )?))
}

#[cfg(not(feature = "provider-openai"))]
fn build_openai(
    _transport: Arc<dyn HttpTransport>,
    channel: &ChannelConfig,
) -> Result<Arc<dyn ProviderAdapter>, AdapterError> {
    Err(feature_disabled(channel, "provider-openai"))
}

#[cfg(feature = "provider-azure")]
fn build_azure(
    transport: Arc<dyn HttpTransport>,
    channel: &ChannelConfig,
) -> Result<Arc<dyn ProviderAdapter>, AdapterError> {
    Ok(Arc::new(crate::adapters::azure::AzureAdapter::from_channel(
        transport, channel,
    )?))
}

#[cfg(not(feature = "provider-azure"))]
fn build_azure(
    _transport: Arc<dyn HttpTransport>,
    channel: &ChannelConfig,
) -> Result<Arc<dyn ProviderAdapter>, AdapterError> {
    Err(feature_disabled(channel, "provider-azure"))
}

#[cfg(feature = "provider-zhinao")]
fn build_zhinao(
    transport: Arc<dyn HttpTransport>,
    channel: &ChannelConfig,
) -> Result<Arc<dyn ProviderAdapter>, AdapterError> {
    Ok(Arc::new(crate::adapters::zhinao::ZhinaoAdapter::from_channel(
        transport, channel,
    )?))
}

#[cfg(not(feature = "provider-zhinao"))]
fn build_zhinao(
    _transport: Arc<dyn HttpTransport>,
    channel: &ChannelConfig,
) -> Result<Arc<dyn ProviderAdapter>, AdapterError> {
    Err(feature_disabled(channel, "provider-zhinao"))
}

#[cfg(not(all(
    feature = "provider-openai",
    feature = "provider-azure",
    feature = "provider-zhinao"
)))]
fn feature_disabled(channel: &ChannelConfig, feature: &str) -> AdapterError {
    AdapterError::configuration(format!(
        "channel '{}' requires the {} feature",
        channel.name, feature
    ))
}

#[cfg(all(test, feature = "provider-openai"))]
mod tests {
    use std::collections::HashMap;

    use serde_json::Value;

    use super::*;
    use crate::{AdapterErrorKind, transport::RawByteStream};

    #[derive(Debug, Default)]
    struct NullTransport;

    impl HttpTransport for NullTransport {
        fn post<'a>(
            &'a self,
            _url: String,
            _headers: HashMap<String, String>,
            _body: Value,
        ) -> crate::AdapterFuture<'a, Result<Value, AdapterError>> {
            Box::pin(async move { Err(AdapterError::transport("unreachable test transport")) })
        }

        fn post_stream<'a>(
            &'a self,
            _url: String,
            _headers: HashMap<String, String>,
            _body: Value,
        ) -> crate::AdapterFuture<'a, Result<RawByteStream<'a>, AdapterError>> {
            Box::pin(async move { Err(AdapterError::transport("unreachable test transport")) })
        }
    }

    fn openai_channel(name: &str) -> ChannelConfig {
        ChannelConfig::new(name, ProviderKind::OpenAi, "https://api.openai.com/v1")
            .with_secrets(vec!["sk-test".to_string()])
            .with_models(vec!["gpt-4o-mini".to_string()])
    }

    #[test]
    fn resolve_builds_once_and_caches_by_channel_name() {
        let registry = AdapterRegistry::new(Arc::new(NullTransport));
        let channel = openai_channel("main");

        let first = registry.resolve(&channel).expect("first resolve");
        let second = registry.resolve(&channel).expect("second resolve");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.kind(), ProviderKind::OpenAi);
    }

    #[test]
    fn malformed_secret_bundle_fails_resolution_without_caching() {
        let registry = AdapterRegistry::new(Arc::new(NullTransport));
        let channel = ChannelConfig::new("bad", ProviderKind::Azure, "2024-02-01")
            .with_secrets(vec!["key-without-resource".to_string()]);

        let error = registry.resolve(&channel).expect_err("bad arity must fail");
        assert_eq!(error.kind, AdapterErrorKind::Configuration);
        assert!(registry.cache().expect("cache").is_empty());
    }

    #[test]
    fn resolve_model_finds_the_serving_channel() {
        let registry = AdapterRegistry::new(Arc::new(NullTransport))
            .with_channel(openai_channel("main"));

        let adapter = registry
            .resolve_model("gpt-4o-mini")
            .expect("model should resolve");
        assert_eq!(adapter.kind(), ProviderKind::OpenAi);

        let error = registry
            .resolve_model("unknown-model")
            .expect_err("unknown model must fail");
        assert_eq!(error.kind, AdapterErrorKind::Configuration);
    }

    #[test]
    fn retry_decoration_preserves_adapter_identity() {
        let registry = AdapterRegistry::new(Arc::new(NullTransport))
            .with_retry(RetryPolicy::new(2), Arc::new(crate::NoopOperationHooks));
        let channel = openai_channel("main");

        let adapter = registry.resolve(&channel).expect("resolve");
        assert_eq!(adapter.kind(), ProviderKind::OpenAi);
        assert!(adapter.build_header().contains_key("Authorization"));
    }
}

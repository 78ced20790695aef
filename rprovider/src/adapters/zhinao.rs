//! Zhinao (360) adapter: bearer auth over the shared OpenAI wire dialect.
//! Chat-only backend; prompt completions and image generation are not
//! offered by this API.

use std::collections::HashMap;
use std::sync::Arc;

use crate::adapters::openai::wire;
use crate::{
    AdapterError, AdapterFuture, BoxedFrameStream, ChannelConfig, ChatRequest, Completion,
    HttpTransport, ProviderAdapter, ProviderKind, RequestInput, stream::normalize_sse,
};

pub struct ZhinaoAdapter {
    transport: Arc<dyn HttpTransport>,
    endpoint: String,
    api_key: String,
}

impl std::fmt::Debug for ZhinaoAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZhinaoAdapter")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

impl ZhinaoAdapter {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    pub fn from_channel(
        transport: Arc<dyn HttpTransport>,
        channel: &ChannelConfig,
    ) -> Result<Self, AdapterError> {
        let mut parts = channel.split_secret()?;
        let api_key = parts.remove(0);
        Ok(Self::new(transport, channel.endpoint.clone(), api_key))
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint.trim_end_matches('/'))
    }

    fn require_messages(request: &ChatRequest) -> Result<(), AdapterError> {
        match request.input {
            RequestInput::Messages(_) => Ok(()),
            RequestInput::Prompt(_) => Err(AdapterError::invalid_request(
                "zhinao accepts message input only",
            )
            .with_provider(ProviderKind::Zhinao)),
        }
    }

    fn tag(error: AdapterError) -> AdapterError {
        error.with_provider(ProviderKind::Zhinao)
    }
}

impl ProviderAdapter for ZhinaoAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Zhinao
    }

    fn build_header(&self) -> HashMap<String, String> {
        HashMap::from([
            ("Content-Type".to_string(), "application/json".to_string()),
            (
                "Authorization".to_string(),
                format!("Bearer {}", self.api_key),
            ),
        ])
    }

    fn send<'a>(
        &'a self,
        request: ChatRequest,
    ) -> AdapterFuture<'a, Result<Completion, AdapterError>> {
        Box::pin(async move {
            request.validate()?;
            Self::require_messages(&request)?;
            let (_, body) = wire::request_body(&request, false)?;
            let response = self
                .transport
                .post(self.chat_url(), self.build_header(), body)
                .await
                .map_err(Self::tag)?;

            wire::parse_chat_response(ProviderKind::Zhinao, &request.model, response)
        })
    }

    fn stream<'a>(
        &'a self,
        request: ChatRequest,
    ) -> AdapterFuture<'a, Result<BoxedFrameStream<'a>, AdapterError>> {
        Box::pin(async move {
            request.validate()?;
            Self::require_messages(&request)?;
            let (_, body) = wire::request_body(&request, true)?;
            let bytes = self
                .transport
                .post_stream(self.chat_url(), self.build_header(), body)
                .await
                .map_err(Self::tag)?;

            Ok(normalize_sse(
                bytes,
                wire::ChunkDecoder::new(ProviderKind::Zhinao),
            ))
        })
    }
}

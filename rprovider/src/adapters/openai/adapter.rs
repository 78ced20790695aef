use std::collections::HashMap;
use std::sync::Arc;

use crate::adapters::image_outcome_from_error;
use crate::{
    AdapterError, AdapterFuture, BoxedFrameStream, ChannelConfig, ChatRequest, Completion,
    HttpTransport, ImageOutcome, ImageRequest, ProviderAdapter, ProviderKind, RequestInput,
    stream::normalize_sse,
};

use super::wire;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiAdapter {
    transport: Arc<dyn HttpTransport>,
    endpoint: String,
    api_key: String,
}

impl std::fmt::Debug for OpenAiAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiAdapter")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

impl OpenAiAdapter {
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

    /// Builds the adapter from a channel's endpoint and single-part secret.
    pub fn from_channel(
        transport: Arc<dyn HttpTransport>,
        channel: &ChannelConfig,
    ) -> Result<Self, AdapterError> {
        let mut parts = channel.split_secret()?;
        let api_key = parts.remove(0);
        Ok(Self::new(transport, channel.endpoint.clone(), api_key))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint.trim_end_matches('/'), path)
    }

    fn tag(error: AdapterError) -> AdapterError {
        error.with_provider(ProviderKind::OpenAi)
    }
}

impl ProviderAdapter for OpenAiAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
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
            let (path, body) = wire::request_body(&request, false)?;
            let response = self
                .transport
                .post(self.url(path), self.build_header(), body)
                .await
                .map_err(Self::tag)?;

            match request.input {
                RequestInput::Messages(_) => {
                    wire::parse_chat_response(ProviderKind::OpenAi, &request.model, response)
                }
                RequestInput::Prompt(_) => {
                    wire::parse_completion_response(ProviderKind::OpenAi, &request.model, response)
                }
            }
        })
    }

    fn stream<'a>(
        &'a self,
        request: ChatRequest,
    ) -> AdapterFuture<'a, Result<BoxedFrameStream<'a>, AdapterError>> {
        Box::pin(async move {
            request.validate()?;
            let (path, body) = wire::request_body(&request, true)?;
            let bytes = self
                .transport
                .post_stream(self.url(path), self.build_header(), body)
                .await
                .map_err(Self::tag)?;

            Ok(normalize_sse(
                bytes,
                wire::ChunkDecoder::new(ProviderKind::OpenAi),
            ))
        })
    }

    fn generate_image<'a>(
        &'a self,
        request: ImageRequest,
    ) -> AdapterFuture<'a, Result<ImageOutcome, AdapterError>> {
        Box::pin(async move {
            request.validate()?;
            let body = wire::image_body(
                Some(&request.model),
                &request.prompt,
                request.resolved_size(),
            );
            let response = self
                .transport
                .post(self.url("images/generations"), self.build_header(), body)
                .await
                .map_err(Self::tag)?;

            match wire::parse_image_response(ProviderKind::OpenAi, response) {
                Ok(url) => Ok(ImageOutcome::Url(url)),
                Err(error) => image_outcome_from_error(error),
            }
        })
    }
}

//! Azure OpenAI adapter: `api-key` header auth, deployment-scoped endpoint
//! templating, image generation over the shared OpenAI wire dialect.
//!
//! Azure channels carry a two-part secret (`api-key|resource-base-url`),
//! and the channel endpoint field carries the API version used in the query
//! string of every deployment URL.

use std::collections::HashMap;
use std::sync::Arc;

use crate::adapters::image_outcome_from_error;
use crate::adapters::openai::wire;
use crate::{
    AdapterError, AdapterFuture, BoxedFrameStream, ChannelConfig, ChatRequest, Completion,
    HttpTransport, ImageOutcome, ImageRequest, ProviderAdapter, ProviderKind,
    stream::normalize_sse,
};

pub struct AzureAdapter {
    transport: Arc<dyn HttpTransport>,
    api_version: String,
    api_key: String,
    resource: String,
}

impl std::fmt::Debug for AzureAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureAdapter")
            .field("api_version", &self.api_version)
            .field("api_key", &self.api_key)
            .field("resource", &self.resource)
            .finish_non_exhaustive()
    }
}

impl AzureAdapter {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        api_version: impl Into<String>,
        api_key: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            api_version: api_version.into(),
            api_key: api_key.into(),
            resource: resource.into(),
        }
    }

    /// Builds the adapter from a channel: the secret splits into api key and
    /// resource base URL, the endpoint field supplies the API version.
    pub fn from_channel(
        transport: Arc<dyn HttpTransport>,
        channel: &ChannelConfig,
    ) -> Result<Self, AdapterError> {
        let mut parts = channel.split_secret()?;
        let api_key = parts.remove(0);
        let resource = parts.remove(0);
        Ok(Self::new(transport, channel.endpoint.clone(), api_key, resource))
    }

    /// Deployment names cannot contain dots, so model ids are sanitized
    /// before they become a path segment.
    fn deployment_url(&self, model: &str, path: &str) -> String {
        let deployment = model.replace('.', "");
        format!(
            "{}/openai/deployments/{}/{}?api-version={}",
            self.resource.trim_end_matches('/'),
            deployment,
            path,
            self.api_version
        )
    }

    fn tag(error: AdapterError) -> AdapterError {
        error.with_provider(ProviderKind::Azure)
    }
}

impl ProviderAdapter for AzureAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Azure
    }

    fn build_header(&self) -> HashMap<String, String> {
        HashMap::from([
            ("Content-Type".to_string(), "application/json".to_string()),
            ("api-key".to_string(), self.api_key.clone()),
        ])
    }

    fn send<'a>(
        &'a self,
        request: ChatRequest,
    ) -> AdapterFuture<'a, Result<Completion, AdapterError>> {
        Box::pin(async move {
            request.validate()?;
            let (path, body) = wire::request_body(&request, false)?;
            let url = self.deployment_url(&request.model, path);
            let response = self
                .transport
                .post(url, self.build_header(), body)
                .await
                .map_err(Self::tag)?;

            match request.input {
                crate::RequestInput::Messages(_) => {
                    wire::parse_chat_response(ProviderKind::Azure, &request.model, response)
                }
                crate::RequestInput::Prompt(_) => {
                    wire::parse_completion_response(ProviderKind::Azure, &request.model, response)
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
            let url = self.deployment_url(&request.model, path);
            let bytes = self
                .transport
                .post_stream(url, self.build_header(), body)
                .await
                .map_err(Self::tag)?;

            Ok(normalize_sse(
                bytes,
                wire::ChunkDecoder::new(ProviderKind::Azure),
            ))
        })
    }

    fn generate_image<'a>(
        &'a self,
        request: ImageRequest,
    ) -> AdapterFuture<'a, Result<ImageOutcome, AdapterError>> {
        Box::pin(async move {
            request.validate()?;
            // The deployment already names the model, so the body omits it.
            let body = wire::image_body(None, &request.prompt, request.resolved_size());
            let url = self.deployment_url(&request.model, "images/generations");
            let response = self
                .transport
                .post(url, self.build_header(), body)
                .await
                .map_err(Self::tag)?;

            match wire::parse_image_response(ProviderKind::Azure, response) {
                Ok(url) => Ok(ImageOutcome::Url(url)),
                Err(error) => image_outcome_from_error(error),
            }
        })
    }
}

//! Provider capability contract shared by every backend adapter.
//!
//! Adapters translate the canonical request/response types to and from one
//! backend's wire format. No provider wire type appears in this contract:
//! callers see `ChatRequest`, `Completion`, `StreamFrame`, and `ImageOutcome`
//! only.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use crate::{
    AdapterError, BoxedFrameStream, ChatRequest, Completion, ImageOutcome, ImageRequest,
};

pub type AdapterFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAi,
    Azure,
    Zhinao,
}

impl ProviderKind {
    /// Number of `|`-separated parts expected in one channel secret bundle:
    /// 1 for bearer-token backends, 2 for backends needing a key plus a
    /// resource name.
    pub fn secret_arity(self) -> usize {
        match self {
            Self::OpenAi | Self::Zhinao => 1,
            Self::Azure => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Azure => "azure",
            Self::Zhinao => "zhinao",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "openai" => Some(Self::OpenAi),
            "azure" => Some(Self::Azure),
            "zhinao" => Some(Self::Zhinao),
            _ => None,
        }
    }
}

impl Display for ProviderKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform capability set implemented by every backend adapter.
///
/// Contract notes:
/// - `build_header` is a pure function of the adapter's stored credentials.
/// - `send` requires a non-empty message sequence or prompt and returns a
///   normalized completion, or an error tagged with the provider kind.
/// - `stream` yields frames in provider-emission order and terminates at the
///   first finish frame, the first error, or transport closure; no frame is
///   ever emitted after termination. Streams are not restartable.
/// - `generate_image` defaults to an `Unsupported` error; image-capable
///   adapters override it. Content-safety refusals surface as a successful
///   `ImageOutcome::Refused`, never as an error.
pub trait ProviderAdapter: Send + Sync + std::fmt::Debug {
    fn kind(&self) -> ProviderKind;

    fn build_header(&self) -> HashMap<String, String>;

    fn send<'a>(
        &'a self,
        request: ChatRequest,
    ) -> AdapterFuture<'a, Result<Completion, AdapterError>>;

    fn stream<'a>(
        &'a self,
        request: ChatRequest,
    ) -> AdapterFuture<'a, Result<BoxedFrameStream<'a>, AdapterError>>;

    fn generate_image<'a>(
        &'a self,
        request: ImageRequest,
    ) -> AdapterFuture<'a, Result<ImageOutcome, AdapterError>> {
        let _ = request;
        let kind = self.kind();
        Box::pin(async move {
            Err(AdapterError::unsupported(
                kind,
                "image generation is not supported by this provider",
            ))
        })
    }
}

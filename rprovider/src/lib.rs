//! Unified provider adapter layer: one capability contract over
//! heterogeneous chat-completion backends, with canonical message types,
//! streaming normalization, channel credentials, and a resolving registry.

mod adapter;
pub mod adapters;
mod channel;
mod error;
mod model;
mod registry;
mod resilience;
mod stream;
mod transport;

pub mod prelude {
    pub use crate::{
        AdapterError, AdapterErrorKind, AdapterFuture, AdapterRegistry, BoxedFrameStream,
        ChannelConfig, ChatRequest, Completion, ContentPart, FinishReason, HttpTransport,
        ImageOutcome, ImageRequest, ImageSize, Message, NoopOperationHooks, ProviderAdapter,
        ProviderKind, ProviderOperationHooks, RequestInput, RetryPolicy, Role, StreamFrame,
        ToolCall, ToolChoice, ToolDefinition, collect_text,
    };
}

pub use adapter::{AdapterFuture, ProviderAdapter, ProviderKind};
pub use channel::ChannelConfig;
pub use error::{AdapterError, AdapterErrorKind};
pub use model::{
    ChatRequest, Completion, ContentPart, FinishReason, ImageOutcome, ImageRequest, ImageSize,
    ImageUrlPart, Message, RequestInput, Role, ToolCall, ToolChoice, ToolDefinition,
    default_image_size,
};
pub use registry::AdapterRegistry;
pub use resilience::{
    NoopOperationHooks, ProviderOperationHooks, RetryPolicy, RetryingAdapter, execute_with_retry,
};
pub use stream::{
    BoxedFrameStream, FrameDecoder, FrameStream, StreamFrame, VecFrameStream, collect_text,
    normalize_sse,
};
pub use transport::{HttpTransport, RawByteStream};

#[cfg(feature = "provider-openai")]
pub use transport::ReqwestTransport;

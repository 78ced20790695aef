//! Primary library for the relay chat routing workspace: re-exports the
//! cross-crate surface and ties conversations, adapters, and persistence
//! together behind [`TurnRunner`].

#[cfg(feature = "provider-openai")]
mod bootstrap;
mod turn;

pub mod prelude {
    #[cfg(feature = "provider-openai")]
    pub use crate::{RegistryBuildConfig, build_registry};
    pub use crate::TurnRunner;
    pub use rchat::prelude::*;
    pub use rmemory::{GatewayConfig, create_gateway};
    pub use robserve::prelude::*;
    pub use rprovider::prelude::*;
}

#[cfg(feature = "provider-openai")]
pub use bootstrap::{RegistryBuildConfig, build_registry};
pub use turn::TurnRunner;

pub use rchat::{
    ANONYMOUS_ID, ChatError, ChatErrorKind, Conversation, ConversationGateway,
    DEFAULT_CONTEXT_WINDOW, DEFAULT_CONVERSATION_NAME, DEFAULT_MODEL, InMemoryGateway, TurnForm,
};
pub use rmemory::{GatewayConfig, PostgresGateway, SqliteGateway, create_gateway};
pub use robserve::{MetricsObservabilityHooks, SafeProviderHooks, TracingObservabilityHooks};
pub use rprovider::{
    AdapterError, AdapterErrorKind, AdapterRegistry, BoxedFrameStream, ChannelConfig, ChatRequest,
    Completion, ContentPart, FinishReason, ImageOutcome, ImageRequest, ImageSize, Message,
    ProviderAdapter, ProviderKind, RequestInput, RetryPolicy, Role, StreamFrame, ToolCall,
    ToolChoice, ToolDefinition, collect_text,
};

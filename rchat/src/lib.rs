//! Conversation state management over the provider adapter layer.

mod conversation;
mod error;
mod gateway;
mod types;

pub mod prelude {
    pub use crate::{
        ANONYMOUS_ID, ChatError, ChatErrorKind, Conversation, ConversationGateway,
        DEFAULT_CONTEXT_WINDOW, DEFAULT_CONVERSATION_NAME, DEFAULT_MODEL, InMemoryGateway,
        TurnForm,
    };
    pub use rcommon::BoxFuture;
}

pub use conversation::{
    ANONYMOUS_ID, Conversation, DEFAULT_CONTEXT_WINDOW, DEFAULT_CONVERSATION_NAME, DEFAULT_MODEL,
};
pub use error::{ChatError, ChatErrorKind};
pub use gateway::{ConversationGateway, InMemoryGateway};
pub use types::TurnForm;

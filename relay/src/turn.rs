//! Turn orchestration: the control flow tying a conversation, the adapter
//! registry, and the persistence gateway together for one user turn.

use std::sync::Arc;

use async_stream::try_stream;
use futures_util::StreamExt;
use rchat::{ChatError, Conversation, ConversationGateway, TurnForm};
use rcommon::text::image_markdown;
use rprovider::{
    AdapterRegistry, BoxedFrameStream, ChatRequest, Completion, ImageOutcome, ImageRequest,
};

/// Runs chat turns end to end: validate and record the user turn, build the
/// provider request from the context slice, call the resolved adapter, and
/// record the assistant reply.
///
/// A runner is shared across conversations; each `Conversation` value must
/// still be driven by one logical turn at a time, which the caller
/// guarantees by serializing per `(user_id, conversation_id)`.
pub struct TurnRunner {
    registry: AdapterRegistry,
    gateway: Arc<dyn ConversationGateway>,
}

impl TurnRunner {
    pub fn new(registry: AdapterRegistry, gateway: Arc<dyn ConversationGateway>) -> Self {
        Self { registry, gateway }
    }

    pub fn gateway(&self) -> &dyn ConversationGateway {
        self.gateway.as_ref()
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Resolves the conversation for an incoming request; see
    /// [`Conversation::resolve`] for the fallback order.
    pub async fn resolve_conversation(
        &self,
        user_id: Option<i64>,
        id: i64,
        share_ref: Option<&str>,
    ) -> Result<Conversation, ChatError> {
        Conversation::resolve(self.gateway.as_ref(), user_id, id, share_ref).await
    }

    /// One non-streaming turn: the assistant reply is appended and persisted
    /// before returning.
    pub async fn run_turn(
        &self,
        conversation: &mut Conversation,
        form: &TurnForm,
    ) -> Result<Completion, ChatError> {
        conversation.handle_turn(self.gateway.as_ref(), form).await?;

        let adapter = self.registry.resolve_model(conversation.model())?;
        let request = build_request(conversation, false);
        let completion = adapter.send(request).await?;

        conversation
            .save_reply(self.gateway.as_ref(), completion.text.clone())
            .await?;

        Ok(completion)
    }

    /// One streaming turn. The user turn is recorded and persisted before
    /// the stream is returned; the provider call itself is issued on first
    /// poll. The caller drains the frames, forwarding each downstream as it
    /// arrives, and then records the accumulated reply with
    /// [`TurnRunner::record_reply`].
    pub async fn stream_turn(
        &self,
        conversation: &mut Conversation,
        form: &TurnForm,
    ) -> Result<BoxedFrameStream<'static>, ChatError> {
        conversation.handle_turn(self.gateway.as_ref(), form).await?;

        let adapter = self.registry.resolve_model(conversation.model())?;
        let request = build_request(conversation, true);

        let stream = try_stream! {
            let mut frames = adapter.stream(request).await?;
            while let Some(frame) = frames.next().await {
                yield frame?;
            }
        };

        Ok(Box::pin(stream))
    }

    /// Appends the completed assistant text and persists the conversation.
    pub async fn record_reply(
        &self,
        conversation: &mut Conversation,
        text: impl Into<String>,
    ) -> Result<(), ChatError> {
        conversation.save_reply(self.gateway.as_ref(), text).await
    }

    /// Generates an image for the conversation's selected model and renders
    /// it as an assistant-ready markdown reply. A content-safety refusal
    /// comes back as the plain refusal text.
    pub async fn generate_image(
        &self,
        conversation: &Conversation,
        prompt: &str,
    ) -> Result<String, ChatError> {
        let adapter = self.registry.resolve_model(conversation.model())?;
        let request = ImageRequest::new(conversation.model(), prompt);

        match adapter.generate_image(request).await? {
            ImageOutcome::Url(url) => Ok(image_markdown(&url)),
            ImageOutcome::Refused(text) => Ok(text),
        }
    }
}

fn build_request(conversation: &Conversation, stream: bool) -> ChatRequest {
    let mut request =
        ChatRequest::from_messages(conversation.model(), conversation.context_slice().to_vec());
    if stream {
        request = request.enable_streaming();
    }
    request
}

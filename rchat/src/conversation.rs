//! The conversation aggregate: message history, context selection, model and
//! feature flags, and the per-turn mutation operations.
//!
//! A conversation is owned by exactly one logical turn at a time; callers
//! serialize turns per `(user_id, conversation_id)`. Persistence goes
//! through an injected [`ConversationGateway`](crate::ConversationGateway);
//! anonymous conversations never persist.

use rcommon::text::truncate_with_ellipsis;
use rprovider::Message;
use serde::{Deserialize, Serialize};

use crate::{ChatError, ConversationGateway, TurnForm};

pub const DEFAULT_CONVERSATION_NAME: &str = "new chat";
pub const DEFAULT_CONTEXT_WINDOW: usize = 8;
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const ANONYMOUS_ID: i64 = -1;

const MAX_NAME_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    user_id: Option<i64>,
    id: i64,
    name: String,
    messages: Vec<Message>,
    model: String,
    enable_web: bool,
    shared: bool,
    context: usize,
}

impl Conversation {
    /// A fresh unauthenticated conversation: id `-1`, never persisted.
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            id: ANONYMOUS_ID,
            name: DEFAULT_CONVERSATION_NAME.to_string(),
            messages: Vec::new(),
            model: DEFAULT_MODEL.to_string(),
            enable_web: false,
            shared: false,
            context: DEFAULT_CONTEXT_WINDOW,
        }
    }

    /// A fresh conversation for an authenticated user, assigned the next
    /// sequential id for that user.
    pub async fn for_user(
        gateway: &dyn ConversationGateway,
        user_id: i64,
    ) -> Result<Self, ChatError> {
        let count = gateway.conversation_count(user_id).await?;
        Ok(Self {
            user_id: Some(user_id),
            id: count + 1,
            ..Self::anonymous()
        })
    }

    /// Rehydrates a conversation from persisted state. Gateway use only.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        user_id: Option<i64>,
        id: i64,
        name: impl Into<String>,
        model: impl Into<String>,
        context: usize,
        enable_web: bool,
        shared: bool,
        messages: Vec<Message>,
    ) -> Self {
        Self {
            user_id,
            id,
            name: name.into(),
            messages,
            model: model.into(),
            enable_web,
            shared,
            context: context.max(1),
        }
    }

    /// Resolution order for an incoming request: shared reference first,
    /// then anonymous, then fresh (`id == -1`), then load-or-fresh.
    pub async fn resolve(
        gateway: &dyn ConversationGateway,
        user_id: Option<i64>,
        id: i64,
        share_ref: Option<&str>,
    ) -> Result<Self, ChatError> {
        if let Some(reference) = share_ref
            && let Some(shared) = gateway.load_shared_conversation(reference).await?
        {
            return Ok(shared);
        }

        let Some(user_id) = user_id else {
            return Ok(Self::anonymous());
        };

        if id == ANONYMOUS_ID {
            return Self::for_user(gateway, user_id).await;
        }

        match gateway.load_conversation(user_id, id).await? {
            Some(conversation) => Ok(conversation),
            None => Self::for_user(gateway, user_id).await,
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user_id
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn is_anonymous(&self) -> bool {
        self.user_id.is_none()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the display name, ellipsis-truncated at 50 characters.
    pub fn rename(&mut self, name: &str) {
        self.name = truncate_with_ellipsis(name, MAX_NAME_CHARS, "...");
    }

    /// The selected model; an empty stored value resolves to the process
    /// default rather than leaking out.
    pub fn model(&self) -> &str {
        if self.model.is_empty() {
            DEFAULT_MODEL
        } else {
            &self.model
        }
    }

    /// Never stores an empty model name.
    pub fn set_model(&mut self, model: &str) {
        self.model = if model.is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            model.to_string()
        };
    }

    pub fn enable_web(&self) -> bool {
        self.enable_web
    }

    pub fn set_enable_web(&mut self, enable: bool) {
        self.enable_web = enable;
    }

    pub fn is_shared(&self) -> bool {
        self.shared
    }

    /// A read-only derived copy for share-link viewers. The viewer's copy is
    /// flagged shared and is never written back.
    pub fn shared_view(&self) -> Self {
        let mut view = self.clone();
        view.shared = true;
        view
    }

    pub fn context_window(&self) -> usize {
        self.context
    }

    /// Window of 1 means "ignore history, use only the latest turn";
    /// anything non-positive normalizes to the default window.
    pub fn set_context_window(&mut self, window: i32) {
        self.context = if window <= 0 {
            DEFAULT_CONTEXT_WINDOW
        } else {
            window as usize
        };
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Borrowed read-only view of the full history, for same-call iteration.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Independent deep copy for callers that retain or mutate history;
    /// later mutation of this conversation cannot alter the snapshot.
    pub fn messages_snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn message_at(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Text of the most recent message, empty when there is none.
    pub fn latest_text(&self) -> String {
        self.messages
            .last()
            .map(Message::text)
            .unwrap_or_default()
    }

    /// The last `min(window, len)` messages in original order. Never
    /// mutates history; this is the slice provider requests are built from.
    pub fn context_slice(&self) -> &[Message] {
        let len = self.messages.len();
        let window = self.context.max(1).min(len);
        &self.messages[len - window..]
    }

    pub fn append_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn append_messages(&mut self, messages: Vec<Message>) {
        self.messages.extend(messages);
    }

    /// Trims surrounding whitespace and appends a user-role turn. An input
    /// that trims to nothing is rejected before any mutation.
    pub fn append_user_turn(&mut self, raw: &str) -> Result<(), ChatError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ChatError::validation("message is empty"));
        }

        self.messages.push(Message::user(trimmed));
        Ok(())
    }

    pub fn append_assistant_turn(&mut self, text: impl Into<String>) {
        self.messages.push(Message::assistant(text));
    }

    pub fn append_system_turn(&mut self, text: impl Into<String>) {
        self.messages.push(Message::system(text));
    }

    /// Inserts at `index`, preserving the relative order of the remaining
    /// elements. Indices past the end clamp to an append.
    pub fn insert_message(&mut self, message: Message, index: usize) {
        let index = index.min(self.messages.len());
        self.messages.insert(index, message);
    }

    pub fn insert_messages(&mut self, messages: Vec<Message>, index: usize) {
        let index = index.min(self.messages.len());
        self.messages.splice(index..index, messages);
    }

    /// Removes and returns the message at `index`. An out-of-range index is
    /// a no-op returning the zero-value sentinel (`Message::default()`)
    /// rather than an error; callers check the sentinel with
    /// [`Message::is_empty`].
    pub fn remove_message(&mut self, index: usize) -> Message {
        if index >= self.messages.len() {
            return Message::default();
        }

        self.messages.remove(index)
    }

    pub fn remove_latest_message(&mut self) -> Message {
        match self.messages.len() {
            0 => Message::default(),
            len => self.remove_message(len - 1),
        }
    }

    /// Applies one turn form: validates and appends the user turn, then the
    /// model/web/context overrides. A validation failure aborts before any
    /// state changes.
    pub fn apply_turn_form(&mut self, form: &TurnForm) -> Result<(), ChatError> {
        self.append_user_turn(&form.message)?;
        self.set_model(&form.model);
        self.set_enable_web(form.web);

        if form.ignore_context {
            self.set_context_window(1);
        } else {
            self.set_context_window(form.context);
        }

        Ok(())
    }

    /// Orchestrates one user turn: validate and apply the form, derive the
    /// conversation name from the first turn, persist. The name derives
    /// whenever history was empty or the name is still the default sentinel.
    pub async fn handle_turn(
        &mut self,
        gateway: &dyn ConversationGateway,
        form: &TurnForm,
    ) -> Result<(), ChatError> {
        let head = self.messages.is_empty() || self.name == DEFAULT_CONVERSATION_NAME;
        self.apply_turn_form(form)?;

        if head {
            self.rename(form.trimmed_message());
        }

        self.save(gateway).await
    }

    /// [`Conversation::handle_turn`] over a raw JSON form body.
    pub async fn handle_turn_json(
        &mut self,
        gateway: &dyn ConversationGateway,
        data: &str,
    ) -> Result<(), ChatError> {
        let form = TurnForm::from_json(data)?;
        self.handle_turn(gateway, &form).await
    }

    /// Records the completed assistant reply and persists.
    pub async fn save_reply(
        &mut self,
        gateway: &dyn ConversationGateway,
        text: impl Into<String>,
    ) -> Result<(), ChatError> {
        self.append_assistant_turn(text);
        self.save(gateway).await
    }

    /// Persists through the gateway. Anonymous conversations never persist;
    /// saving one succeeds without touching the gateway.
    pub async fn save(&self, gateway: &dyn ConversationGateway) -> Result<(), ChatError> {
        if self.is_anonymous() {
            return Ok(());
        }

        gateway.save_conversation(self).await
    }
}

//! Conversation persistence contract and a basic in-memory implementation.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use rcommon::BoxFuture;

use crate::{ChatError, Conversation};

/// Durable storage seam for conversations. Implementations own their own
/// schema and connection lifecycle; the aggregate only ever calls through
/// this trait. Writes for one conversation must be applied in
/// turn-completion order, which the caller guarantees by serializing turns
/// per `(user_id, conversation_id)`.
pub trait ConversationGateway: Send + Sync {
    fn load_conversation(
        &self,
        user_id: i64,
        conversation_id: i64,
    ) -> BoxFuture<'_, Result<Option<Conversation>, ChatError>>;

    fn save_conversation<'a>(
        &'a self,
        conversation: &'a Conversation,
    ) -> BoxFuture<'a, Result<(), ChatError>>;

    /// Number of stored conversations for a user; the aggregate assigns the
    /// next sequential id as `count + 1`.
    fn conversation_count(&self, user_id: i64) -> BoxFuture<'_, Result<i64, ChatError>>;

    /// Resolves a share reference to a read-only conversation view.
    fn load_shared_conversation<'a>(
        &'a self,
        reference: &'a str,
    ) -> BoxFuture<'a, Result<Option<Conversation>, ChatError>>;
}

#[derive(Debug, Default)]
pub struct InMemoryGateway {
    conversations: Mutex<HashMap<(i64, i64), Conversation>>,
    shares: Mutex<HashMap<String, (i64, i64)>>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a share reference pointing at a stored conversation.
    pub fn share(
        &self,
        reference: impl Into<String>,
        user_id: i64,
        conversation_id: i64,
    ) -> Result<(), ChatError> {
        self.shares_mut()?
            .insert(reference.into(), (user_id, conversation_id));
        Ok(())
    }

    fn conversations_ref(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<(i64, i64), Conversation>>, ChatError> {
        self.conversations
            .lock()
            .map_err(|_| ChatError::persistence("conversation store lock poisoned"))
    }

    fn shares_mut(&self) -> Result<MutexGuard<'_, HashMap<String, (i64, i64)>>, ChatError> {
        self.shares
            .lock()
            .map_err(|_| ChatError::persistence("share store lock poisoned"))
    }
}

impl ConversationGateway for InMemoryGateway {
    fn load_conversation(
        &self,
        user_id: i64,
        conversation_id: i64,
    ) -> BoxFuture<'_, Result<Option<Conversation>, ChatError>> {
        Box::pin(async move {
            Ok(self
                .conversations_ref()?
                .get(&(user_id, conversation_id))
                .cloned())
        })
    }

    fn save_conversation<'a>(
        &'a self,
        conversation: &'a Conversation,
    ) -> BoxFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            let Some(user_id) = conversation.user_id() else {
                return Err(ChatError::persistence(
                    "anonymous conversations cannot be persisted",
                ));
            };

            self.conversations_ref()?
                .insert((user_id, conversation.id()), conversation.clone());
            Ok(())
        })
    }

    fn conversation_count(&self, user_id: i64) -> BoxFuture<'_, Result<i64, ChatError>> {
        Box::pin(async move {
            Ok(self
                .conversations_ref()?
                .keys()
                .filter(|(owner, _)| *owner == user_id)
                .count() as i64)
        })
    }

    fn load_shared_conversation<'a>(
        &'a self,
        reference: &'a str,
    ) -> BoxFuture<'a, Result<Option<Conversation>, ChatError>> {
        Box::pin(async move {
            let target = {
                let shares = self
                    .shares
                    .lock()
                    .map_err(|_| ChatError::persistence("share store lock poisoned"))?;
                shares.get(reference).copied()
            };

            let Some((user_id, conversation_id)) = target else {
                return Ok(None);
            };

            Ok(self
                .conversations_ref()?
                .get(&(user_id, conversation_id))
                .map(Conversation::shared_view))
        })
    }
}

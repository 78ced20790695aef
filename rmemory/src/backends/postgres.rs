//! PostgreSQL-backed conversation gateway over tokio-postgres.
//!
//! Same storage shape as the SQLite backend: columns for identity and flags,
//! a JSONB document for message history. The connection driver task runs on
//! the tokio runtime that called [`PostgresGateway::connect`].

use rcommon::BoxFuture;
use rchat::{ChatError, Conversation, ConversationGateway};
use rprovider::Message;
use tokio_postgres::{Client, NoTls, Row};

pub struct PostgresGateway {
    client: Client,
}

impl PostgresGateway {
    pub async fn connect(connection: &str) -> Result<Self, ChatError> {
        let (client, driver) = tokio_postgres::connect(connection, NoTls)
            .await
            .map_err(|error| {
                ChatError::persistence(format!("failed to connect to postgres: {error}"))
            })?;

        tokio::spawn(async move {
            let _ = driver.await;
        });

        let gateway = Self { client };
        gateway.initialize_schema().await?;
        Ok(gateway)
    }

    async fn initialize_schema(&self) -> Result<(), ChatError> {
        self.client
            .batch_execute(
                "
                CREATE TABLE IF NOT EXISTS conversation (
                    user_id BIGINT NOT NULL,
                    conversation_id BIGINT NOT NULL,
                    conversation_name TEXT NOT NULL,
                    model TEXT NOT NULL,
                    context BIGINT NOT NULL,
                    enable_web BOOLEAN NOT NULL,
                    data JSONB NOT NULL,
                    PRIMARY KEY (user_id, conversation_id)
                );

                CREATE TABLE IF NOT EXISTS sharing (
                    hash TEXT PRIMARY KEY,
                    user_id BIGINT NOT NULL,
                    conversation_id BIGINT NOT NULL
                );
                ",
            )
            .await
            .map_err(|error| {
                ChatError::persistence(format!("failed to initialize postgres schema: {error}"))
            })
    }

    pub async fn share(
        &self,
        reference: &str,
        user_id: i64,
        conversation_id: i64,
    ) -> Result<(), ChatError> {
        self.client
            .execute(
                "INSERT INTO sharing (hash, user_id, conversation_id) VALUES ($1, $2, $3)
                 ON CONFLICT (hash) DO UPDATE
                 SET user_id = EXCLUDED.user_id, conversation_id = EXCLUDED.conversation_id",
                &[&reference, &user_id, &conversation_id],
            )
            .await
            .map_err(|error| {
                ChatError::persistence(format!("failed to register share: {error}"))
            })?;
        Ok(())
    }

    fn row_to_conversation(row: &Row) -> Result<Conversation, ChatError> {
        let user_id: i64 = row.get("user_id");
        let conversation_id: i64 = row.get("conversation_id");
        let name: String = row.get("conversation_name");
        let model: String = row.get("model");
        let context: i64 = row.get("context");
        let enable_web: bool = row.get("enable_web");
        let data: serde_json::Value = row.get("data");

        let messages: Vec<Message> = serde_json::from_value(data).map_err(|error| {
            ChatError::persistence(format!("failed to decode messages: {error}"))
        })?;

        Ok(Conversation::from_parts(
            Some(user_id),
            conversation_id,
            name,
            model,
            context.max(1) as usize,
            enable_web,
            false,
            messages,
        ))
    }
}

impl ConversationGateway for PostgresGateway {
    fn load_conversation(
        &self,
        user_id: i64,
        conversation_id: i64,
    ) -> BoxFuture<'_, Result<Option<Conversation>, ChatError>> {
        Box::pin(async move {
            let row = self
                .client
                .query_opt(
                    "SELECT user_id, conversation_id, conversation_name, model, context, enable_web, data
                     FROM conversation WHERE user_id = $1 AND conversation_id = $2",
                    &[&user_id, &conversation_id],
                )
                .await
                .map_err(|error| {
                    ChatError::persistence(format!("failed to load conversation: {error}"))
                })?;

            row.as_ref().map(Self::row_to_conversation).transpose()
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

            let data = serde_json::to_value(conversation.messages()).map_err(|error| {
                ChatError::persistence(format!("failed to encode messages: {error}"))
            })?;

            self.client
                .execute(
                    "INSERT INTO conversation
                     (user_id, conversation_id, conversation_name, model, context, enable_web, data)
                     VALUES ($1, $2, $3, $4, $5, $6, $7)
                     ON CONFLICT (user_id, conversation_id) DO UPDATE
                     SET conversation_name = EXCLUDED.conversation_name,
                         model = EXCLUDED.model,
                         context = EXCLUDED.context,
                         enable_web = EXCLUDED.enable_web,
                         data = EXCLUDED.data",
                    &[
                        &user_id,
                        &conversation.id(),
                        &conversation.name(),
                        &conversation.model(),
                        &(conversation.context_window() as i64),
                        &conversation.enable_web(),
                        &data,
                    ],
                )
                .await
                .map_err(|error| {
                    ChatError::persistence(format!("failed to save conversation: {error}"))
                })?;

            Ok(())
        })
    }

    fn conversation_count(&self, user_id: i64) -> BoxFuture<'_, Result<i64, ChatError>> {
        Box::pin(async move {
            let row = self
                .client
                .query_one(
                    "SELECT COUNT(*) FROM conversation WHERE user_id = $1",
                    &[&user_id],
                )
                .await
                .map_err(|error| {
                    ChatError::persistence(format!("failed to count conversations: {error}"))
                })?;

            Ok(row.get::<_, i64>(0))
        })
    }

    fn load_shared_conversation<'a>(
        &'a self,
        reference: &'a str,
    ) -> BoxFuture<'a, Result<Option<Conversation>, ChatError>> {
        Box::pin(async move {
            let row = self
                .client
                .query_opt(
                    "SELECT c.user_id, c.conversation_id, c.conversation_name, c.model,
                            c.context, c.enable_web, c.data
                     FROM sharing s
                     JOIN conversation c
                       ON c.user_id = s.user_id AND c.conversation_id = s.conversation_id
                     WHERE s.hash = $1",
                    &[&reference],
                )
                .await
                .map_err(|error| {
                    ChatError::persistence(format!("failed to load shared conversation: {error}"))
                })?;

            let loaded = row.as_ref().map(Self::row_to_conversation).transpose()?;
            Ok(loaded.map(|conversation| conversation.shared_view()))
        })
    }
}

//! SQLite-backed conversation gateway.
//!
//! History rides in a JSON document column; identity, naming, and flags are
//! plain columns so lookups never deserialize message bodies.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rcommon::BoxFuture;
use rchat::{ChatError, Conversation, ConversationGateway};
use rprovider::Message;
use rusqlite::{Connection, OptionalExtension, params};

pub fn default_sqlite_path() -> PathBuf {
    PathBuf::from("relay.db")
}

#[derive(Debug)]
pub struct SqliteGateway {
    connection: Mutex<Connection>,
}

impl SqliteGateway {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, ChatError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|error| {
                ChatError::persistence(format!(
                    "failed to create sqlite parent directory: {error}"
                ))
            })?;
        }

        let connection = Connection::open(path).map_err(|error| {
            ChatError::persistence(format!("failed to open sqlite database: {error}"))
        })?;

        Self::from_connection(connection)
    }

    pub fn new_in_memory() -> Result<Self, ChatError> {
        let connection = Connection::open_in_memory().map_err(|error| {
            ChatError::persistence(format!("failed to open in-memory sqlite database: {error}"))
        })?;

        Self::from_connection(connection)
    }

    fn from_connection(connection: Connection) -> Result<Self, ChatError> {
        connection
            .busy_timeout(Duration::from_secs(5))
            .map_err(|error| {
                ChatError::persistence(format!("failed to configure sqlite busy timeout: {error}"))
            })?;

        let gateway = Self {
            connection: Mutex::new(connection),
        };
        gateway.initialize_schema()?;
        Ok(gateway)
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>, ChatError> {
        self.connection
            .lock()
            .map_err(|_| ChatError::persistence("sqlite gateway lock poisoned"))
    }

    fn initialize_schema(&self) -> Result<(), ChatError> {
        let conn = self.connection()?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            CREATE TABLE IF NOT EXISTS conversation (
                user_id INTEGER NOT NULL,
                conversation_id INTEGER NOT NULL,
                conversation_name TEXT NOT NULL,
                model TEXT NOT NULL,
                context INTEGER NOT NULL,
                enable_web INTEGER NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (user_id, conversation_id)
            );

            CREATE TABLE IF NOT EXISTS sharing (
                hash TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL,
                conversation_id INTEGER NOT NULL
            );
            ",
        )
        .map_err(|error| {
            ChatError::persistence(format!("failed to initialize sqlite schema: {error}"))
        })
    }

    /// Registers a share reference pointing at a stored conversation.
    pub fn share(
        &self,
        reference: &str,
        user_id: i64,
        conversation_id: i64,
    ) -> Result<(), ChatError> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT OR REPLACE INTO sharing (hash, user_id, conversation_id) VALUES (?1, ?2, ?3)",
            params![reference, user_id, conversation_id],
        )
        .map_err(|error| ChatError::persistence(format!("failed to register share: {error}")))?;
        Ok(())
    }

    fn row_to_conversation(row: &rusqlite::Row<'_>) -> Result<Conversation, rusqlite::Error> {
        let user_id: i64 = row.get("user_id")?;
        let conversation_id: i64 = row.get("conversation_id")?;
        let name: String = row.get("conversation_name")?;
        let model: String = row.get("model")?;
        let context: i64 = row.get("context")?;
        let enable_web: bool = row.get("enable_web")?;
        let data: String = row.get("data")?;

        let messages: Vec<Message> = serde_json::from_str(&data).map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(error),
            )
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

impl ConversationGateway for SqliteGateway {
    fn load_conversation(
        &self,
        user_id: i64,
        conversation_id: i64,
    ) -> BoxFuture<'_, Result<Option<Conversation>, ChatError>> {
        Box::pin(async move {
            let conn = self.connection()?;
            conn.query_row(
                "SELECT user_id, conversation_id, conversation_name, model, context, enable_web, data
                 FROM conversation WHERE user_id = ?1 AND conversation_id = ?2",
                params![user_id, conversation_id],
                Self::row_to_conversation,
            )
            .optional()
            .map_err(|error| {
                ChatError::persistence(format!("failed to load conversation: {error}"))
            })
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

            let data = serde_json::to_string(conversation.messages()).map_err(|error| {
                ChatError::persistence(format!("failed to encode messages: {error}"))
            })?;

            let conn = self.connection()?;
            conn.execute(
                "INSERT OR REPLACE INTO conversation
                 (user_id, conversation_id, conversation_name, model, context, enable_web, data)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    user_id,
                    conversation.id(),
                    conversation.name(),
                    conversation.model(),
                    conversation.context_window() as i64,
                    conversation.enable_web(),
                    data
                ],
            )
            .map_err(|error| {
                ChatError::persistence(format!("failed to save conversation: {error}"))
            })?;

            Ok(())
        })
    }

    fn conversation_count(&self, user_id: i64) -> BoxFuture<'_, Result<i64, ChatError>> {
        Box::pin(async move {
            let conn = self.connection()?;
            conn.query_row(
                "SELECT COUNT(*) FROM conversation WHERE user_id = ?1",
                params![user_id],
                |row| row.get::<_, i64>(0),
            )
            .map_err(|error| {
                ChatError::persistence(format!("failed to count conversations: {error}"))
            })
        })
    }

    fn load_shared_conversation<'a>(
        &'a self,
        reference: &'a str,
    ) -> BoxFuture<'a, Result<Option<Conversation>, ChatError>> {
        Box::pin(async move {
            let conn = self.connection()?;
            let loaded = conn
                .query_row(
                    "SELECT c.user_id, c.conversation_id, c.conversation_name, c.model,
                            c.context, c.enable_web, c.data
                     FROM sharing s
                     JOIN conversation c
                       ON c.user_id = s.user_id AND c.conversation_id = s.conversation_id
                     WHERE s.hash = ?1",
                    params![reference],
                    Self::row_to_conversation,
                )
                .optional()
                .map_err(|error| {
                    ChatError::persistence(format!("failed to load shared conversation: {error}"))
                })?;

            Ok(loaded.map(|conversation| conversation.shared_view()))
        })
    }
}

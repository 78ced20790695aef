//! Durable conversation gateways: SQLite and PostgreSQL backends behind the
//! chat layer's persistence contract, plus a config-driven factory.

mod backends;

use std::path::PathBuf;
use std::sync::Arc;

use rchat::{ChatError, ConversationGateway, InMemoryGateway};

pub use backends::postgres::PostgresGateway;
pub use backends::sqlite::{SqliteGateway, default_sqlite_path};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayConfig {
    Sqlite { path: PathBuf },
    Postgres { connection: String },
    InMemory,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: default_sqlite_path(),
        }
    }
}

/// Builds a gateway from configuration. Connection lifecycle beyond the
/// initial connect (reconnect loops, pool sizing) belongs to the embedding
/// application, not the gateway.
pub async fn create_gateway(
    config: GatewayConfig,
) -> Result<Arc<dyn ConversationGateway>, ChatError> {
    match config {
        GatewayConfig::Sqlite { path } => Ok(Arc::new(SqliteGateway::new(path)?)),
        GatewayConfig::Postgres { connection } => {
            Ok(Arc::new(PostgresGateway::connect(&connection).await?))
        }
        GatewayConfig::InMemory => Ok(Arc::new(InMemoryGateway::new())),
    }
}

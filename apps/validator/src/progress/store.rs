use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProgressStoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Progress store unavailable: {0}")]
    Unavailable(String),
}

/// List-append / list-range storage behind the progress log.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn append(&self, key: &str, value: String) -> Result<(), ProgressStoreError>;

    /// Returns every value stored under `key`, oldest first.
    async fn range(&self, key: &str) -> Result<Vec<String>, ProgressStoreError>;
}

/// Redis lists (`RPUSH` / `LRANGE 0 -1`).
#[derive(Clone)]
pub struct RedisProgressStore {
    connection: MultiplexedConnection,
}

impl RedisProgressStore {
    pub async fn connect(client: &redis::Client) -> Result<Self, ProgressStoreError> {
        let connection = client.get_multiplexed_async_connection().await?;
        Ok(Self { connection })
    }
}

#[async_trait]
impl ProgressStore for RedisProgressStore {
    async fn append(&self, key: &str, value: String) -> Result<(), ProgressStoreError> {
        let mut connection = self.connection.clone();
        connection.rpush::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn range(&self, key: &str) -> Result<Vec<String>, ProgressStoreError> {
        let mut connection = self.connection.clone();
        let values: Vec<String> = connection.lrange(key, 0, -1).await?;
        Ok(values)
    }
}

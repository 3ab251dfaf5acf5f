/// Redis key-value wrapper with graceful degradation.
///
/// `get` returns `Option<T>` and writes return `bool`. On any Redis error the operation logs a
/// warning and reports the miss; `try_get` hands the error back instead. Callers carry on
/// without persisted state. A server built on this type is fully functional when Redis is
/// absent.
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use tracing::warn;

use crate::error::CommonError;

pub struct RedisCache {
    client: Option<redis::Client>,
}

impl RedisCache {
    /// Build a client for the given URL. If the URL is `None` or invalid, the returned
    /// `RedisCache` turns every operation into a no-op.
    pub fn new(url: Option<&str>) -> Self {
        let client = url.and_then(|u| {
            redis::Client::open(u)
                .inspect_err(|e| warn!(error = %e, url = u, "failed to create redis client, persistence disabled"))
                .ok()
        });
        Self { client }
    }

    /// A cache that never talks to Redis.
    pub fn disabled() -> Self {
        Self { client: None }
    }

    /// Send a PING and surface the failure reason.
    pub async fn ping(&self) -> Result<(), CommonError> {
        let client = self.client.as_ref().ok_or(CommonError::RedisUnavailable)?;
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    /// Returns `true` if Redis is configured and answers a PING.
    pub async fn is_available(&self) -> bool {
        self.ping().await.is_ok()
    }

    /// Get a value, keeping "key missing" (`Ok(None)`) apart from a failed read.
    ///
    /// Use this before a read-modify-write: treating an error as a miss would overwrite
    /// whatever the key holds.
    pub async fn try_get(&self, key: &str) -> Result<Option<String>, CommonError> {
        let client = self.client.as_ref().ok_or(CommonError::RedisUnavailable)?;
        let mut conn = client.get_multiplexed_async_connection().await?;
        Ok(conn.get::<_, Option<String>>(key).await?)
    }

    /// Get a value. Returns `None` if Redis is unavailable or the key doesn't exist.
    pub async fn get(&self, key: &str) -> Option<String> {
        self.try_get(key)
            .await
            .inspect_err(|e| warn!(error = %e, key, "redis GET failed"))
            .ok()
            .flatten()
    }

    /// Set a value with no expiry. Returns `true` if successful.
    pub async fn set(&self, key: &str, value: &str) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };
        conn.set::<_, _, ()>(key, value)
            .await
            .inspect_err(|e| warn!(error = %e, key, "redis SET failed"))
            .is_ok()
    }

    async fn connection(&self) -> Option<MultiplexedConnection> {
        self.client
            .as_ref()?
            .get_multiplexed_async_connection()
            .await
            .inspect_err(|e| warn!(error = %e, "redis connection failed"))
            .ok()
    }
}

use crate::error::{CstoreError, Result};
use crate::registry::CoordinationBackend;
use async_trait::async_trait;
use redis::{AsyncCommands, Client};
use std::time::Duration;

/// Redis-based coordination backend
pub struct RedisBackend {
    conn: redis::aio::MultiplexedConnection,
}

impl RedisBackend {
    /// Connect to Redis and verify the connection with a ping
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url)
            .map_err(|e| CstoreError::Config(format!("Invalid Redis url {}: {}", url, e)))?;

        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| CstoreError::Coordination(format!("Failed to connect to Redis: {}", e)))?;

        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| CstoreError::Coordination(format!("Redis ping failed: {}", e)))?;

        Ok(Self { conn })
    }
}

#[async_trait]
impl CoordinationBackend for RedisBackend {
    async fn incr(&mut self, key: &str) -> Result<i64> {
        let value: i64 = self.conn.incr(key, 1).await?;
        Ok(value)
    }

    async fn set_with_ttl(&mut self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let _: () = self.conn.pset_ex(key, value, millis).await?;
        Ok(())
    }

    async fn get(&mut self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = self.conn.get(key).await?;
        Ok(value)
    }

    async fn get_many(&mut self, keys: &[String]) -> Result<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(keys)
            .query_async(&mut self.conn)
            .await?;
        Ok(values)
    }

    async fn delete(&mut self, key: &str) -> Result<()> {
        let _: i64 = self.conn.del(key).await?;
        Ok(())
    }

    async fn set_add(&mut self, key: &str, member: &str) -> Result<()> {
        let _: i64 = self.conn.sadd(key, member).await?;
        Ok(())
    }

    async fn set_members(&mut self, key: &str) -> Result<Vec<String>> {
        let members: Vec<String> = self.conn.smembers(key).await?;
        Ok(members)
    }

    async fn set_random_member(&mut self, key: &str) -> Result<Option<String>> {
        let member: Option<String> = self.conn.srandmember(key).await?;
        Ok(member)
    }
}

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Primitive commands the registry issues against the shared coordination
/// service.
///
/// Implementations are driven through `&mut self`: the registry serializes
/// every call behind one lock, so a backend never sees concurrent commands.
#[async_trait]
pub trait CoordinationBackend: Send + Sync {
    /// Atomically increment the integer at `key` and return the new value.
    async fn incr(&mut self, key: &str) -> Result<i64>;

    /// Set `key` to `value`, expiring after `ttl`.
    async fn set_with_ttl(&mut self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    async fn get(&mut self, key: &str) -> Result<Option<String>>;

    /// Fetch several string keys in one round trip, preserving order.
    async fn get_many(&mut self, keys: &[String]) -> Result<Vec<Option<String>>>;

    async fn delete(&mut self, key: &str) -> Result<()>;

    async fn set_add(&mut self, key: &str, member: &str) -> Result<()>;

    async fn set_members(&mut self, key: &str) -> Result<Vec<String>>;

    /// One arbitrary member of the set at `key`, or `None` when it is empty.
    async fn set_random_member(&mut self, key: &str) -> Result<Option<String>>;
}

use crate::error::{CstoreError, Result};
use crate::registry::CoordinationBackend;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// In-process coordination backend.
///
/// Clones share the same keyspace, so several registries built from clones of
/// one `MemoryBackend` behave like servers sharing one Redis. Expiry follows
/// the tokio clock, which lets paused-time tests drive lease expiry.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    entries: HashMap<String, Entry>,
    cursor: usize,
}

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

enum Value {
    Str(String),
    Set(BTreeSet<String>),
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MemoryState {
    fn live(&mut self, key: &str) -> Option<&mut Entry> {
        let expired = self
            .entries
            .get(key)
            .and_then(|entry| entry.expires_at)
            .is_some_and(|deadline| deadline <= Instant::now());
        if expired {
            self.entries.remove(key);
        }
        self.entries.get_mut(key)
    }

    fn get_str(&mut self, key: &str) -> Result<Option<String>> {
        match self.live(key) {
            Some(Entry {
                value: Value::Str(value),
                ..
            }) => Ok(Some(value.clone())),
            Some(_) => Err(wrong_type(key)),
            None => Ok(None),
        }
    }

    fn set_mut(&mut self, key: &str) -> Result<Option<&mut BTreeSet<String>>> {
        match self.live(key) {
            Some(Entry {
                value: Value::Set(members),
                ..
            }) => Ok(Some(members)),
            Some(_) => Err(wrong_type(key)),
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend").finish_non_exhaustive()
    }
}

fn wrong_type(key: &str) -> CstoreError {
    CstoreError::Coordination(format!(
        "WRONGTYPE operation against key holding the wrong kind of value: {}",
        key
    ))
}

#[async_trait]
impl CoordinationBackend for MemoryBackend {
    async fn incr(&mut self, key: &str) -> Result<i64> {
        let mut state = self.state();
        let current = match state.get_str(key)? {
            Some(raw) => raw.parse::<i64>().map_err(|_| {
                CstoreError::Coordination(format!("value is not an integer: {}", key))
            })?,
            None => 0,
        };

        let next = current + 1;
        let expires_at = state.live(key).and_then(|entry| entry.expires_at);
        state.entries.insert(
            key.to_string(),
            Entry {
                value: Value::Str(next.to_string()),
                expires_at,
            },
        );
        Ok(next)
    }

    async fn set_with_ttl(&mut self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.state().entries.insert(
            key.to_string(),
            Entry {
                value: Value::Str(value.to_string()),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn get(&mut self, key: &str) -> Result<Option<String>> {
        self.state().get_str(key)
    }

    async fn get_many(&mut self, keys: &[String]) -> Result<Vec<Option<String>>> {
        let mut state = self.state();
        // MGET answers nil for keys of another type rather than failing.
        Ok(keys
            .iter()
            .map(|key| state.get_str(key).ok().flatten())
            .collect())
    }

    async fn delete(&mut self, key: &str) -> Result<()> {
        self.state().entries.remove(key);
        Ok(())
    }

    async fn set_add(&mut self, key: &str, member: &str) -> Result<()> {
        let mut state = self.state();
        if let Some(members) = state.set_mut(key)? {
            members.insert(member.to_string());
            return Ok(());
        }

        state.entries.insert(
            key.to_string(),
            Entry {
                value: Value::Set(BTreeSet::from([member.to_string()])),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn set_members(&mut self, key: &str) -> Result<Vec<String>> {
        let mut state = self.state();
        Ok(state
            .set_mut(key)?
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn set_random_member(&mut self, key: &str) -> Result<Option<String>> {
        let mut state = self.state();
        let cursor = state.cursor;
        state.cursor = state.cursor.wrapping_add(1);

        let Some(members) = state.set_mut(key)? else {
            return Ok(None);
        };
        if members.is_empty() {
            return Ok(None);
        }
        Ok(members.iter().nth(cursor % members.len()).cloned())
    }
}

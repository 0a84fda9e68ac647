//! Per-key async locks for templates and instances.
//!
//! Operations acquire every key they touch up front, in key order, under a
//! single deadline. If the deadline passes, the locks already taken are
//! released and the caller gets [`CoreError::LockTimeout`]. Nothing is
//! retried here.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rota_core::types::{RecordId, TemplateId};
use rota_core::CoreError;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;

/// A lockable resource. Ordering defines acquisition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockKey {
    Template(TemplateId),
    Instance(RecordId),
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKey::Template(id) => write!(f, "template:{id}"),
            LockKey::Instance(id) => write!(f, "instance:{id}"),
        }
    }
}

/// Guards for a set of keys. Dropping it releases them all.
#[derive(Debug)]
pub struct LockSet {
    keys: Vec<LockKey>,
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl LockSet {
    pub fn keys(&self) -> &[LockKey] {
        &self.keys
    }
}

pub struct LockRegistry {
    locks: Mutex<HashMap<LockKey, Arc<Mutex<()>>>>,
    timeout: Duration,
}

impl LockRegistry {
    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    /// Acquire every key in `keys` (duplicates ignored) within the
    /// registry's timeout.
    pub async fn acquire(
        &self,
        keys: impl IntoIterator<Item = LockKey>,
    ) -> Result<LockSet, CoreError> {
        let mut keys: Vec<LockKey> = keys.into_iter().collect();
        keys.sort();
        keys.dedup();

        let deadline = Instant::now() + self.timeout;
        let mut guards = Vec::with_capacity(keys.len());
        for key in &keys {
            let lock = self.lock_for(*key).await;
            match tokio::time::timeout_at(deadline, lock.lock_owned()).await {
                Ok(guard) => guards.push(guard),
                Err(_) => {
                    tracing::warn!(
                        resource = %key,
                        held = guards.len(),
                        timeout_ms = self.timeout.as_millis() as u64,
                        "Lock acquisition timed out",
                    );
                    return Err(CoreError::LockTimeout {
                        resource: key.to_string(),
                    });
                }
            }
        }
        Ok(LockSet {
            keys,
            _guards: guards,
        })
    }

    async fn lock_for(&self, key: LockKey) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(key).or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn disjoint_keys_do_not_block() {
        let registry = LockRegistry::new(Duration::from_millis(50));
        let _a = registry.acquire([LockKey::Template(1)]).await.unwrap();
        let b = registry.acquire([LockKey::Template(2)]).await.unwrap();
        assert_eq!(b.keys(), &[LockKey::Template(2)]);
    }

    #[tokio::test]
    async fn held_key_times_out() {
        let registry = LockRegistry::new(Duration::from_millis(20));
        let _held = registry.acquire([LockKey::Template(1)]).await.unwrap();

        let result = registry
            .acquire([LockKey::Template(2), LockKey::Template(1)])
            .await;
        assert_matches!(
            result,
            Err(CoreError::LockTimeout { ref resource }) if resource == "template:1"
        );

        // Template 2 was released when the acquisition failed.
        assert!(registry.acquire([LockKey::Template(2)]).await.is_ok());
    }

    #[tokio::test]
    async fn released_on_drop() {
        let registry = LockRegistry::new(Duration::from_millis(20));
        let held = registry.acquire([LockKey::Template(1)]).await.unwrap();
        drop(held);
        assert!(registry.acquire([LockKey::Template(1)]).await.is_ok());
    }

    #[tokio::test]
    async fn duplicate_keys_are_taken_once() {
        let registry = LockRegistry::new(Duration::from_millis(20));
        let set = registry
            .acquire([LockKey::Template(3), LockKey::Template(3)])
            .await
            .unwrap();
        assert_eq!(set.keys().len(), 1);
    }
}

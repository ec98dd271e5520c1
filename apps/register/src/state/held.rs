//! # Held Cart State
//!
//! Key-value store for held carts: reads are served from memory, writes are
//! mirrored to the `key_value` table. Loaded from the database at startup,
//! so held carts survive a restart.

use std::sync::{Mutex, MutexGuard};

use checkout_core::ports::{InMemoryKeyValueStore, KeyValueStore};

use crate::handoff::{Handoff, HandoffHandle};

/// [`KeyValueStore`] that writes through to SQLite.
#[derive(Debug)]
pub struct MirroredStore {
    memory: InMemoryKeyValueStore,
    handoff: HandoffHandle,
}

impl MirroredStore {
    pub fn new(entries: Vec<(String, String)>, handoff: HandoffHandle) -> Self {
        MirroredStore {
            memory: InMemoryKeyValueStore::from_entries(entries),
            handoff,
        }
    }
}

impl KeyValueStore for MirroredStore {
    fn get(&self, key: &str) -> Option<String> {
        self.memory.get(key)
    }

    fn put(&mut self, key: &str, value: String) {
        self.handoff.send(Handoff::KeyValuePut {
            key: key.to_string(),
            value: value.clone(),
        });
        self.memory.put(key, value);
    }

    fn remove(&mut self, key: &str) -> Option<String> {
        let removed = self.memory.remove(key);
        if removed.is_some() {
            self.handoff.send(Handoff::KeyValueRemoved(key.to_string()));
        }
        removed
    }

    fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.memory.keys_with_prefix(prefix)
    }
}

/// Shared access to the held cart store.
#[derive(Debug)]
pub struct HeldCartState {
    store: Mutex<MirroredStore>,
}

impl HeldCartState {
    pub fn new(store: MirroredStore) -> Self {
        HeldCartState {
            store: Mutex::new(store),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MirroredStore> {
        match self.store.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn with_store<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&MirroredStore) -> R,
    {
        let store = self.lock();
        f(&store)
    }

    pub fn with_store_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut MirroredStore) -> R,
    {
        let mut store = self.lock();
        f(&mut store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handoff::channel;

    #[test]
    fn test_writes_are_mirrored() {
        let (handle, mut rx) = channel();
        let mut store = MirroredStore::new(vec![("held_cart:a".into(), "{}".into())], handle);

        assert_eq!(store.get("held_cart:a").as_deref(), Some("{}"));

        store.put("held_cart:b", "[]".to_string());
        assert!(matches!(
            rx.try_recv(),
            Ok(Handoff::KeyValuePut { key, .. }) if key == "held_cart:b"
        ));

        assert!(store.remove("missing").is_none());
        assert!(rx.try_recv().is_err());

        store.remove("held_cart:a");
        assert!(matches!(rx.try_recv(), Ok(Handoff::KeyValueRemoved(_))));
        assert_eq!(store.keys_with_prefix("held_cart:"), vec!["held_cart:b"]);
    }
}

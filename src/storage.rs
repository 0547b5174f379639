//! Key-value persistence for history and translation cache.
//!
//! The browser's `localStorage` backs the real thing; `MemoryStorage` is used
//! when storage is unavailable (private mode, sandboxed iframes) and in tests.
//! Values are JSON documents; the schema belongs to the store that writes them.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{AssistantError, Result};

pub trait KvStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;
}

/// `window.localStorage`.
pub struct LocalStorage {
    storage: web_sys::Storage,
}

impl LocalStorage {
    /// `None` when the page has no usable local storage.
    pub fn open() -> Option<Self> {
        let window = web_sys::window()?;
        let storage = window.local_storage().ok()??;
        Some(Self { storage })
    }
}

impl KvStorage for LocalStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.storage
            .get_item(key)
            .map_err(|e| AssistantError::Storage(format!("{:?}", e)))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        // Quota errors land here.
        self.storage
            .set_item(key, value)
            .map_err(|e| AssistantError::Storage(format!("{:?}", e)))
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.storage
            .remove_item(key)
            .map_err(|e| AssistantError::Storage(format!("{:?}", e)))
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    items: RefCell<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

/// A namespaced view onto a `KvStorage`.
#[derive(Clone)]
pub struct StorageScope {
    storage: Rc<dyn KvStorage>,
    prefix: String,
}

impl StorageScope {
    pub fn new(storage: Rc<dyn KvStorage>, prefix: &str) -> Self {
        Self {
            storage,
            prefix: prefix.to_string(),
        }
    }

    fn full_key(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Load and decode `name`. Corrupt payloads are logged and treated as
    /// absent so a bad write never wedges the assistant.
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let raw = match self.storage.get_item(&self.full_key(name)) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                crate::warn_log!("failed to read {}: {}", name, e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                crate::warn_log!("discarding unreadable {}: {}", name, e);
                None
            }
        }
    }

    pub fn save<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.storage.set_item(&self.full_key(name), &raw)
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        self.storage.remove_item(&self.full_key(name))
    }
}

/// Local storage when available, memory otherwise.
pub fn default_storage() -> Rc<dyn KvStorage> {
    match LocalStorage::open() {
        Some(local) => Rc::new(local),
        None => {
            crate::warn_log!("localStorage unavailable, history and cache will not persist");
            Rc::new(MemoryStorage::new())
        }
    }
}

//! Copy-on-write builder properties.
//!
//! [`Properties`] is an ordered, string-keyed map of arbitrary values. Forking
//! it freezes a snapshot of the current contents into a shared, immutable
//! layer; the fork then writes only to its own layer and falls back to the
//! frozen chain on a miss. The parent keeps writing to its own local layer,
//! which the fork never sees.
//!
//! ```text
//!   parent.local ──(snapshot on fork)──► frozen ──► frozen ──► …
//!                                          ▲
//!   child.local  ──────────────────────────┘
//! ```

use indexmap::IndexMap;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A shared, type-erased property value.
pub type PropertyValue = Arc<dyn Any + Send + Sync>;

/// `None` marks a key removed in this layer.
type Entries = IndexMap<String, Option<PropertyValue>>;

struct Layer {
    entries: Entries,
    parent: Option<Arc<Layer>>,
}

/// Layered property map with copy-on-write isolation between forks.
///
/// # Example
///
/// ```
/// use gatehouse_middleware::Properties;
///
/// let mut parent = Properties::new();
/// parent.set("realm", "api".to_string());
///
/// let mut child = parent.fork();
/// child.set("realm", "admin".to_string());
///
/// assert_eq!(parent.get::<String>("realm").map(String::as_str), Some("api"));
/// assert_eq!(child.get::<String>("realm").map(String::as_str), Some("admin"));
/// ```
#[derive(Default)]
pub struct Properties {
    local: Entries,
    frozen: Option<Arc<Layer>>,
}

impl Properties {
    /// Creates an empty property map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an isolated copy that initially sees every visible pair.
    ///
    /// Only the local layer is copied, and its values are shared `Arc`s;
    /// older layers are shared by reference.
    #[must_use]
    pub fn fork(&self) -> Self {
        let frozen = if self.local.is_empty() {
            self.frozen.clone()
        } else {
            Some(Arc::new(Layer {
                entries: self.local.clone(),
                parent: self.frozen.clone(),
            }))
        };

        Self {
            local: IndexMap::new(),
            frozen,
        }
    }

    /// Sets a value, shadowing any inherited value for the same key.
    pub fn set<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.set_value(key, Arc::new(value));
    }

    /// Sets an already-shared value.
    pub fn set_value(&mut self, key: impl Into<String>, value: PropertyValue) {
        self.local.insert(key.into(), Some(value));
    }

    /// Returns the value for `key` if present and of type `T`.
    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.get_value(key)?.downcast_ref::<T>()
    }

    /// Returns the type-erased value for `key`.
    #[must_use]
    pub fn get_value(&self, key: &str) -> Option<&PropertyValue> {
        if let Some(slot) = self.local.get(key) {
            return slot.as_ref();
        }

        let mut layer = self.frozen.as_deref();
        while let Some(current) = layer {
            if let Some(slot) = current.entries.get(key) {
                return slot.as_ref();
            }
            layer = current.parent.as_deref();
        }
        None
    }

    /// Whether `key` is visible.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get_value(key).is_some()
    }

    /// Hides `key` in this map only. Returns whether it was visible.
    pub fn remove(&mut self, key: &str) -> bool {
        if !self.contains_key(key) {
            return false;
        }
        if self.inherits(key) {
            self.local.insert(key.to_string(), None);
        } else {
            self.local.shift_remove(key);
        }
        true
    }

    /// Visible keys, in first-insertion order across all layers.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        self.visible().into_keys().collect()
    }

    /// Number of visible keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.visible().len()
    }

    /// Whether no key is visible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn inherits(&self, key: &str) -> bool {
        let mut layer = self.frozen.as_deref();
        while let Some(current) = layer {
            if let Some(slot) = current.entries.get(key) {
                return slot.is_some();
            }
            layer = current.parent.as_deref();
        }
        false
    }

    fn visible(&self) -> IndexMap<&str, &PropertyValue> {
        let mut chain: Vec<&Entries> = Vec::new();
        let mut layer = self.frozen.as_deref();
        while let Some(current) = layer {
            chain.push(&current.entries);
            layer = current.parent.as_deref();
        }
        chain.reverse();
        chain.push(&self.local);

        let mut merged = IndexMap::new();
        for entries in chain {
            for (key, slot) in entries {
                match slot {
                    Some(value) => {
                        merged.insert(key.as_str(), value);
                    }
                    None => {
                        merged.shift_remove(key.as_str());
                    }
                }
            }
        }
        merged
    }
}

impl fmt::Debug for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Properties")
            .field("keys", &self.keys())
            .finish()
    }
}

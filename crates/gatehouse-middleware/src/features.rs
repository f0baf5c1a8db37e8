//! Host capability set exposed to pipeline builders.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

/// An opaque, typed set of capabilities supplied by the hosting server.
///
/// Builders only read it; a child builder shares its parent's set.
///
/// ```
/// use gatehouse_middleware::FeatureSet;
///
/// struct ServerName(&'static str);
///
/// let mut features = FeatureSet::new();
/// features.insert(ServerName("edge-1"));
/// assert_eq!(features.get::<ServerName>().map(|s| s.0), Some("edge-1"));
/// ```
#[derive(Default)]
pub struct FeatureSet {
    entries: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl FeatureSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a feature, replacing any previous one of the same type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, feature: T) {
        self.entries.insert(TypeId::of::<T>(), Box::new(feature));
    }

    /// Returns the feature of type `T`, if registered.
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|f| f.downcast_ref())
    }

    /// Whether a feature of type `T` is registered.
    #[must_use]
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    /// Number of registered features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureSet")
            .field("len", &self.entries.len())
            .finish()
    }
}

//! Override storage backends
//!
//! Overrides are explicitly stored values for a (feature, context) pair or a
//! (feature, global) pair. Group memberships live in a separate per-context
//! store. The default backend is [`MemoryStore`].

mod memory;

pub use memory::MemoryStore;

use crate::context::ContextKey;
use crate::value::Variation;
use std::collections::{BTreeSet, HashMap};

/// One per-context override write
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideWrite {
    pub context: ContextKey,
    pub feature: String,
    pub value: Variation,
}

impl OverrideWrite {
    pub fn new(context: ContextKey, feature: impl Into<String>, value: Variation) -> Self {
        Self {
            context,
            feature: feature.into(),
            value,
        }
    }
}

/// Trait for override storage backends
///
/// All operations are synchronous and must not block on I/O. Concurrent
/// writers to the same key resolve last-write-wins.
pub trait FeatureStore: Send + Sync {
    /// Per-context override for a feature
    fn get(&self, feature: &str, context: &ContextKey) -> Option<Variation>;

    /// Write a per-context override
    fn set(&self, feature: &str, context: &ContextKey, value: Variation);

    /// Whether the context has any override for the feature, whatever its value
    fn has(&self, feature: &str, context: &ContextKey) -> bool {
        self.get(feature, context).is_some()
    }

    /// Remove a per-context override. Returns whether one existed.
    fn forget(&self, feature: &str, context: &ContextKey) -> bool;

    /// Global override for a feature
    fn get_global(&self, feature: &str) -> Option<Variation>;

    /// Write a global override
    fn set_global(&self, feature: &str, value: Variation);

    /// Remove a global override. Returns whether one existed.
    fn forget_global(&self, feature: &str) -> bool;

    /// Snapshot of every global override
    fn global_overrides(&self) -> HashMap<String, Variation>;

    /// Snapshot of a context's overrides
    fn overrides(&self, context: &ContextKey) -> HashMap<String, Variation>;

    /// Replace a context's whole override collection
    fn replace_overrides(&self, context: &ContextKey, overrides: HashMap<String, Variation>);

    /// Apply a batch of writes.
    ///
    /// All writes for one context must become visible together.
    fn apply(&self, writes: Vec<OverrideWrite>) {
        for write in writes {
            self.set(&write.feature, &write.context, write.value);
        }
    }

    /// Groups the context is a member of
    fn groups(&self, context: &ContextKey) -> BTreeSet<String>;

    /// Replace a context's group memberships
    fn replace_groups(&self, context: &ContextKey, groups: BTreeSet<String>);

    /// Add one group membership
    fn add_group(&self, context: &ContextKey, group: &str);

    /// Remove a feature's overrides from every context and the global scope
    fn purge(&self, feature: &str);

    /// Remove every override and membership
    fn flush(&self);

    /// Get store type name for debugging
    fn store_type(&self) -> &'static str;
}
